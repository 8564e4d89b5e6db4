use crate::core::RecordId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Existence status of a record as seen by the lock service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordState {
    Live,
    Deleted,
    Missing,
}

impl RecordState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Read-only view of the record store the lock service validates keys against.
///
/// Assets and field definitions share one id namespace.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn record_state(&self, id: &RecordId) -> RecordState;
}

/// Record registry kept in memory, keyed by id with a soft-delete flag
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, bool>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_live(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            records: RwLock::new(ids.into_iter().map(|id| (id, false)).collect()),
        }
    }

    /// Registers a record (or revives a soft-deleted one).
    pub async fn upsert(&self, id: RecordId) {
        let mut records = self.records.write().await;
        records.insert(id, false);
    }

    /// Flags a record as deleted. Returns `false` if the id was unknown.
    pub async fn soft_delete(&self, id: &RecordId) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(deleted) => {
                *deleted = true;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &RecordId) -> bool {
        let mut records = self.records.write().await;
        records.remove(id).is_some()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn record_state(&self, id: &RecordId) -> RecordState {
        let records = self.records.read().await;
        match records.get(id) {
            Some(false) => RecordState::Live,
            Some(true) => RecordState::Deleted,
            None => RecordState::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_lifecycle() {
        let store = InMemoryRecordStore::new();
        let id = RecordId::from("asset-1");

        assert_eq!(store.record_state(&id).await, RecordState::Missing);
        store.upsert(id.clone()).await;
        assert_eq!(store.record_state(&id).await, RecordState::Live);
        assert!(store.soft_delete(&id).await);
        assert_eq!(store.record_state(&id).await, RecordState::Deleted);
        store.upsert(id.clone()).await;
        assert!(store.record_state(&id).await.is_live());
        assert!(store.remove(&id).await);
        assert!(!store.soft_delete(&id).await);
    }
}
