//! In-memory storage adapters
//!
//! Same semantics as the PostgreSQL adapters, held in mutex-guarded maps.
//! The payment uniqueness guard is checked under the same lock as the
//! append, mirroring the database's unique index: the check-then-insert is
//! atomic even against concurrent callers. Used by tests and development.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use core_kernel::{AccountId, PolicyId};
use domain_fulfillment::{AccountDirectory, AccountError};
use domain_policy::{
    EventStore, LifecycleEvent, Policy, PolicyRepository, RecordedEvent, StoreError, Traveler,
};

/// In-memory, thread-safe event store
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<EventLog>,
}

#[derive(Default)]
struct EventLog {
    events: HashMap<PolicyId, Vec<RecordedEvent>>,
    payment_sessions: HashSet<(PolicyId, String)>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        policy_id: PolicyId,
        event: LifecycleEvent,
    ) -> Result<RecordedEvent, StoreError> {
        let recorded = RecordedEvent::new(policy_id, event);

        let mut log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = recorded.event.payment_session_guard() {
            let key = (policy_id, session.to_string());
            if log.payment_sessions.contains(&key) {
                return Err(StoreError::DuplicatePayment {
                    checkout_session_id: session.to_string(),
                });
            }
            log.payment_sessions.insert(key);
        }
        log.events.entry(policy_id).or_default().push(recorded.clone());

        Ok(recorded)
    }

    async fn events_for(&self, policy_id: PolicyId) -> Result<Vec<RecordedEvent>, StoreError> {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(log.events.get(&policy_id).cloned().unwrap_or_default())
    }
}

/// In-memory policy and traveler repository
#[derive(Default)]
pub struct InMemoryPolicyRepository {
    inner: Mutex<HashMap<PolicyId, (Policy, Vec<Traveler>)>>,
}

impl InMemoryPolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyRepository for InMemoryPolicyRepository {
    async fn insert(&self, policy: &Policy, travelers: &[Traveler]) -> Result<(), StoreError> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(policy.id, (policy.clone(), travelers.to_vec()));
        Ok(())
    }

    async fn get(
        &self,
        policy_id: PolicyId,
    ) -> Result<Option<(Policy, Vec<Traveler>)>, StoreError> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(&policy_id).cloned())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Policy>, StoreError> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map
            .values()
            .filter(|(policy, _)| policy.account_id == account_id)
            .map(|(policy, _)| policy.clone())
            .collect())
    }
}

/// In-memory account directory
#[derive(Default)]
pub struct InMemoryAccountDirectory {
    inner: Mutex<HashMap<String, AccountId>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn resolve_or_create(&self, email: &str) -> Result<AccountId, AccountError> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(*map
            .entry(email.to_ascii_lowercase())
            .or_insert_with(AccountId::new))
    }
}
