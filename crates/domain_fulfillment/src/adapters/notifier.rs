//! Tracing-backed notifier
//!
//! The mailing collaborator is fire-and-forget and not part of the core's
//! correctness; this adapter records the notification intent in the logs.

use async_trait::async_trait;
use tracing::info;

use core_kernel::{Money, PolicyId};
use domain_policy::Policy;

use crate::ports::PolicyNotifier;

/// Notifier that logs instead of mailing
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl PolicyNotifier for TracingNotifier {
    async fn policy_confirmed(&self, policy: &Policy) {
        info!(policy_id = %policy.id, tier = %policy.coverage_label, "policy confirmed notification");
    }

    async fn refund_processed(&self, policy_id: PolicyId, amount: Money) {
        info!(policy_id = %policy_id, %amount, "refund processed notification");
    }
}
