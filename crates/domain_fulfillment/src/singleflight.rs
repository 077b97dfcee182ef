//! Per-policy single-flight claims
//!
//! Two redelivered payment notifications can both pass the idempotency scan
//! in a narrow race; the claim registry guarantees at most one saga executes
//! per policy at a time. The loser observes the held claim and exits without
//! side effects. Claims release on drop, including on panic unwind.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use core_kernel::PolicyId;

/// Registry of policies with a saga currently in flight
#[derive(Clone, Default)]
pub struct SagaLocks {
    held: Arc<Mutex<HashSet<PolicyId>>>,
}

impl SagaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to claim the policy; `None` when a saga already holds it
    pub fn try_claim(&self, policy_id: PolicyId) -> Option<SagaClaim> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.insert(policy_id) {
            Some(SagaClaim {
                locks: self.clone(),
                policy_id,
            })
        } else {
            None
        }
    }

    fn release(&self, policy_id: PolicyId) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&policy_id);
    }
}

/// RAII claim on a policy's saga execution
pub struct SagaClaim {
    locks: SagaLocks,
    policy_id: PolicyId,
}

impl Drop for SagaClaim {
    fn drop(&mut self) {
        self.locks.release(self.policy_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_loses() {
        let locks = SagaLocks::new();
        let policy_id = PolicyId::new();

        let claim = locks.try_claim(policy_id);
        assert!(claim.is_some());
        assert!(locks.try_claim(policy_id).is_none());
    }

    #[test]
    fn test_claim_releases_on_drop() {
        let locks = SagaLocks::new();
        let policy_id = PolicyId::new();

        drop(locks.try_claim(policy_id));
        assert!(locks.try_claim(policy_id).is_some());
    }

    #[test]
    fn test_claims_are_per_policy() {
        let locks = SagaLocks::new();
        let _a = locks.try_claim(PolicyId::new()).unwrap();
        assert!(locks.try_claim(PolicyId::new()).is_some());
    }
}
