use crate::core::LeaseView;
use crate::model::{AssetRecord, FieldDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full authoritative state as delivered by the subscription transport.
///
/// Leases are those the server considered active; they are re-checked against
/// `taken_at` when labels are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
    #[serde(default)]
    pub definitions: Vec<FieldDefinition>,
    #[serde(default)]
    pub leases: Vec<LeaseView>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            assets: Vec::new(),
            definitions: Vec::new(),
            leases: Vec::new(),
        }
    }

    pub fn with_asset(mut self, asset: AssetRecord) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_definition(mut self, definition: FieldDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_lease(mut self, lease: LeaseView) -> Self {
        self.leases.push(lease);
        self
    }
}
