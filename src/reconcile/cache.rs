use crate::core::{FieldId, FieldValue, LeaseKey, RecordId};
use crate::model::{AssetRecord, FieldDefinition};
use crate::reconcile::validation::ValidationReport;
use chrono::{DateTime, Utc};
use im::OrdMap;
use serde::Serialize;
use std::sync::Arc;

/// Local mirror of one asset.
///
/// Every field value sits behind its own `Arc` so a merge can replace one cell
/// while the others keep their identity.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    pub id: RecordId,
    pub name: String,
    pub metadata: OrdMap<FieldId, Arc<FieldValue>>,
    pub validation: Arc<ValidationReport>,
    pub updated_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl CachedAsset {
    pub fn field(&self, field: &FieldId) -> Option<&Arc<FieldValue>> {
        self.metadata.get(field)
    }

    /// Value equality against an inbound record, ignoring bookkeeping
    /// (`updated_at`, `revision`).
    pub fn same_content(&self, record: &AssetRecord) -> bool {
        self.name == record.name
            && self.metadata.len() == record.metadata.len()
            && record
                .metadata
                .iter()
                .all(|(field, value)| self.metadata.get(field).is_some_and(|v| **v == *value))
    }
}

/// What the editor needs to decide between an editable and a read-only control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockView {
    pub locked: bool,
    pub locked_by_label: Option<String>,
}

impl LockView {
    fn from_label(label: Option<&Arc<str>>) -> Self {
        Self {
            locked: label.is_some(),
            locked_by_label: label.map(|label| label.to_string()),
        }
    }
}

/// Client-side state derived from authoritative snapshots.
///
/// Cloning is cheap (persistent maps); two caches compare equal when their
/// content is equal, regardless of sharing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalCache {
    pub(crate) assets: OrdMap<RecordId, Arc<CachedAsset>>,
    pub(crate) definitions: OrdMap<FieldId, Arc<FieldDefinition>>,
    /// "Locked by" labels for keys held by someone other than the viewer.
    pub(crate) labels: OrdMap<LeaseKey, Arc<str>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(&self, id: &RecordId) -> Option<&Arc<CachedAsset>> {
        self.assets.get(id)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Arc<CachedAsset>> {
        self.assets.values()
    }

    pub fn definition(&self, id: &FieldId) -> Option<&Arc<FieldDefinition>> {
        self.definitions.get(id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<FieldDefinition>> {
        self.definitions.values()
    }

    pub fn lock_label(&self, key: &LeaseKey) -> Option<&Arc<str>> {
        self.labels.get(key)
    }

    /// Lock state of one cell (value-level lock).
    pub fn lock_view(&self, record: &RecordId, field: &FieldId) -> LockView {
        let key = LeaseKey::Field(record.clone(), field.clone());
        LockView::from_label(self.labels.get(&key))
    }

    /// Lock state of a whole record, e.g. a field definition being edited.
    pub fn definition_lock_view(&self, record: &RecordId) -> LockView {
        LockView::from_label(self.labels.get(&LeaseKey::Record(record.clone())))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
