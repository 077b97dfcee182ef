//! Lifecycle event store on PostgreSQL
//!
//! One table for every event kind: the variant is a type tag plus a JSONB
//! payload. Appends are single-row inserts; the partial unique index on
//! `(policy_id, checkout_session_id)` enforces payment idempotency at the
//! storage layer, and its violation is translated to
//! `StoreError::DuplicatePayment` rather than surfaced as a failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{EventId, PolicyId};
use domain_policy::{EventStore, LifecycleEvent, RecordedEvent, StoreError};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// Event store backed by the `lifecycle_events` table
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: DatabasePool,
}

impl PgEventStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(
        &self,
        policy_id: PolicyId,
        event: LifecycleEvent,
    ) -> Result<RecordedEvent, StoreError> {
        let recorded = RecordedEvent::new(policy_id, event);
        let payload = serde_json::to_value(&recorded.event)
            .map_err(|e| StoreError::serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO lifecycle_events (
                id, policy_id, event_type, payload, checkout_session_id, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recorded.id.as_uuid())
        .bind(policy_id.as_uuid())
        .bind(recorded.event.event_type())
        .bind(&payload)
        .bind(recorded.event.payment_session_guard())
        .bind(recorded.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from);

        match result {
            Ok(_) => {
                debug!(policy_id = %policy_id, event_type = recorded.event.event_type(), "event appended");
                Ok(recorded)
            }
            Err(err) if err.is_duplicate() => {
                let checkout_session_id = recorded
                    .event
                    .payment_session_guard()
                    .unwrap_or_default()
                    .to_string();
                Err(StoreError::DuplicatePayment {
                    checkout_session_id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn events_for(&self, policy_id: PolicyId) -> Result<Vec<RecordedEvent>, StoreError> {
        // Deliberately unsorted: ordering is the projector's concern.
        let rows = sqlx::query(
            r#"
            SELECT id, policy_id, payload, recorded_at
            FROM lifecycle_events
            WHERE policy_id = $1
            "#,
        )
        .bind(policy_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let policy_uuid: Uuid = row.get("policy_id");
                let payload: serde_json::Value = row.get("payload");
                let recorded_at: DateTime<Utc> = row.get("recorded_at");

                let event: LifecycleEvent = serde_json::from_value(payload)
                    .map_err(|e| StoreError::serialization(e.to_string()))?;

                Ok(RecordedEvent {
                    id: EventId::from(id),
                    policy_id: PolicyId::from(policy_uuid),
                    recorded_at,
                    event,
                })
            })
            .collect()
    }
}
