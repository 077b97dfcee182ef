//! Worker dispatch
//!
//! Background executions are enqueued only after their triggering event is
//! durably appended. The pool always observes a successful invocation:
//! business-level failures end up as `Failed` events inside the saga, and
//! infrastructure failures are logged here, keeping the two failure planes
//! separate.

use std::sync::Arc;

use tracing::{error, info};

use core_kernel::PolicyId;

use crate::refund::RefundWorkflow;
use crate::saga::FulfillmentSaga;

/// Enqueues background lifecycle work
///
/// At-least-once semantics are fine on both paths: the saga is single-flight
/// and resumable, refund processing is idempotent.
pub trait JobDispatcher: Send + Sync {
    /// Enqueues a fulfillment saga run for the policy
    fn dispatch_fulfillment(&self, policy_id: PolicyId);

    /// Enqueues the refund's external-call phase for the policy
    fn dispatch_refund(&self, policy_id: PolicyId);
}

/// Dispatcher backed by the tokio runtime
pub struct WorkerPool {
    saga: Arc<FulfillmentSaga>,
    refunds: Arc<RefundWorkflow>,
}

impl WorkerPool {
    pub fn new(saga: Arc<FulfillmentSaga>, refunds: Arc<RefundWorkflow>) -> Self {
        Self { saga, refunds }
    }
}

impl JobDispatcher for WorkerPool {
    fn dispatch_fulfillment(&self, policy_id: PolicyId) {
        let saga = Arc::clone(&self.saga);
        tokio::spawn(async move {
            match saga.run(policy_id).await {
                Ok(outcome) => {
                    info!(policy_id = %policy_id, ?outcome, "fulfillment run finished")
                }
                Err(err) => {
                    error!(policy_id = %policy_id, %err, "fulfillment run hit infrastructure failure")
                }
            }
        });
    }

    fn dispatch_refund(&self, policy_id: PolicyId) {
        let refunds = Arc::clone(&self.refunds);
        tokio::spawn(async move {
            match refunds.process(policy_id).await {
                Ok(()) => info!(policy_id = %policy_id, "refund processing finished"),
                Err(err) => {
                    error!(policy_id = %policy_id, %err, "refund processing failed, policy stays refund_initiated")
                }
            }
        });
    }
}
