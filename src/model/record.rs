use crate::core::{FieldId, FieldValue, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An inventory asset as carried by an authoritative snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<FieldId, FieldValue>,
    #[serde(default)]
    pub deleted: bool,

    // Bookkeeping: ignored when deciding whether a record changed.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revision: u64,
}

impl AssetRecord {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata: BTreeMap::new(),
            deleted: false,
            updated_at: None,
            revision: 0,
        }
    }

    pub fn with_field(mut self, field: impl Into<FieldId>, value: impl Into<FieldValue>) -> Self {
        self.metadata.insert(field.into(), value.into());
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }
}
