//! State projection
//!
//! A policy's current state and its history are pure functions of its event
//! set. The projector is the one place that computes them: it merges all
//! variants, sorts by recording time, and breaks exact-timestamp ties by
//! variant precedence so that a late-arriving failure still wins over a
//! pending state. It never trusts write-time ordering and never raises on an
//! event set that violates expected ordering.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::PolicyId;

use crate::events::{LifecycleEvent, PolicyState, RecordedEvent};
use crate::store::{EventStore, StoreError};

/// One entry of a policy's state history
///
/// Carries the variant name, the recording timestamp, and the variant
/// payload. The append envelope (row and policy identifiers) is not exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub state: PolicyState,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: LifecycleEvent,
}

/// Derives the current state from an event set
///
/// The record with the maximum recording timestamp wins; ties are broken by
/// variant precedence, then by event id for determinism. Returns `None` for
/// a policy with no events (a purchase whose checkout never opened).
pub fn current_state(events: &[RecordedEvent]) -> Option<PolicyState> {
    events
        .iter()
        .max_by_key(|e| (e.recorded_at, e.state().precedence(), e.id))
        .map(|e| e.state())
}

/// Derives the full state history, ascending by recording time
///
/// Pure and restartable: the same event set always yields the same entries,
/// and repeated calls do not consume anything. Tolerates ordering violations
/// (e.g. a failure with no preceding contract) without error.
pub fn history(events: &[RecordedEvent]) -> Vec<StateEntry> {
    let mut sorted: Vec<&RecordedEvent> = events.iter().collect();
    sorted.sort_by_key(|e| (e.recorded_at, e.state().precedence(), e.id));
    sorted
        .into_iter()
        .map(|e| StateEntry {
            state: e.state(),
            recorded_at: e.recorded_at,
            detail: e.event.clone(),
        })
        .collect()
}

/// Read-only projection over the event store
///
/// Safe to call concurrently and repeatedly; it only ever reads.
#[derive(Clone)]
pub struct StateProjector {
    events: Arc<dyn EventStore>,
}

impl StateProjector {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Returns the policy's current state name, if any event exists
    pub async fn current_state(
        &self,
        policy_id: PolicyId,
    ) -> Result<Option<PolicyState>, StoreError> {
        let events = self.events.events_for(policy_id).await?;
        Ok(current_state(&events))
    }

    /// Returns the policy's full ordered state history
    pub async fn history(&self, policy_id: PolicyId) -> Result<Vec<StateEntry>, StoreError> {
        let events = self.events.events_for(policy_id).await?;
        Ok(history(&events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::EventId;

    fn recorded_at(
        policy_id: PolicyId,
        event: LifecycleEvent,
        at: DateTime<Utc>,
    ) -> RecordedEvent {
        RecordedEvent {
            id: EventId::new_v7(),
            policy_id,
            recorded_at: at,
            event,
        }
    }

    #[test]
    fn test_latest_timestamp_wins() {
        let policy_id = PolicyId::new();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 5, 0).unwrap();

        let events = vec![
            recorded_at(
                policy_id,
                LifecycleEvent::PendingPayment {
                    checkout_session_id: "cs_1".to_string(),
                },
                t0,
            ),
            recorded_at(
                policy_id,
                LifecycleEvent::Failed {
                    step: crate::events::FulfillmentStep::ContractCreation,
                    error_message: "rejected".to_string(),
                    created_by: None,
                },
                t1,
            ),
        ];

        assert_eq!(current_state(&events), Some(PolicyState::Failed));
    }

    #[test]
    fn test_tie_broken_by_precedence() {
        let policy_id = PolicyId::new();
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

        // Same instant: the failure must win over the pending state
        let events = vec![
            recorded_at(
                policy_id,
                LifecycleEvent::Failed {
                    step: crate::events::FulfillmentStep::ContractConfirmation,
                    error_message: "timeout".to_string(),
                    created_by: None,
                },
                t,
            ),
            recorded_at(
                policy_id,
                LifecycleEvent::PendingPayment {
                    checkout_session_id: "cs_1".to_string(),
                },
                t,
            ),
        ];

        assert_eq!(current_state(&events), Some(PolicyState::Failed));
    }

    #[test]
    fn test_empty_event_set() {
        assert_eq!(current_state(&[]), None);
        assert!(history(&[]).is_empty());
    }

    #[test]
    fn test_orphan_failure_tolerated() {
        // A Failed with no preceding ContractCreated must not panic
        let policy_id = PolicyId::new();
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let events = vec![recorded_at(
            policy_id,
            LifecycleEvent::Failed {
                step: crate::events::FulfillmentStep::DocumentRetrieval,
                error_message: "storage offline".to_string(),
                created_by: Some("ops@example.com".to_string()),
            },
            t,
        )];

        let entries = history(&events);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].state, PolicyState::Failed);
    }
}
