use crate::core::{ActorId, FieldId, RecordId};
use crate::reconcile::cache::{LocalCache, LockView};
use crate::reconcile::merge::{ReconcileStats, reconcile};
use crate::reconcile::snapshot::Snapshot;
use crate::reconcile::validation::Validator;
use tokio::sync::RwLock;
use tracing::debug;

/// Owns one viewer's local cache.
///
/// Snapshots are applied one at a time under the write lock, so every merge
/// runs to completion against the result of the previous one.
pub struct ClientMirror {
    viewer: ActorId,
    validator: Validator,
    cache: RwLock<LocalCache>,
}

impl ClientMirror {
    pub fn new(viewer: ActorId, validator: Validator) -> Self {
        Self {
            viewer,
            validator,
            cache: RwLock::new(LocalCache::new()),
        }
    }

    pub fn viewer(&self) -> &ActorId {
        &self.viewer
    }

    pub async fn apply(&self, snapshot: &Snapshot) -> ReconcileStats {
        let mut cache = self.cache.write().await;
        let outcome = reconcile(&cache, snapshot, &self.viewer, &self.validator);
        if !outcome.stats.is_noop() {
            debug!(
                viewer = %self.viewer,
                inserted = outcome.stats.records_inserted,
                updated = outcome.stats.records_updated,
                removed = outcome.stats.records_removed,
                field_writes = outcome.stats.field_writes,
                labels_changed = outcome.stats.labels_changed,
                "snapshot reconciled"
            );
            *cache = outcome.cache;
        }
        outcome.stats
    }

    /// Cheap clone of the current cache.
    pub async fn current(&self) -> LocalCache {
        self.cache.read().await.clone()
    }

    pub async fn lock_view(&self, record: &RecordId, field: &FieldId) -> LockView {
        self.cache.read().await.lock_view(record, field)
    }
}
