//! Startup data for the server: known actors and the records they may lock.

use crate::auth::ActorDirectory;
use crate::core::{Actor, InvError, RecordId, Result};
use crate::storage::InMemoryRecordStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub records: Vec<SeedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    pub id: RecordId,
    #[serde(default)]
    pub deleted: bool,
}

impl Seed {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| InvError::Config(format!("invalid seed file: {}", e)))
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&text)
    }

    /// Registers every actor and record. Records flagged `deleted` are
    /// inserted and then soft-deleted so lookups report them as deleted.
    pub async fn install(&self, directory: &ActorDirectory, records: &InMemoryRecordStore) {
        for actor in &self.actors {
            directory.register(actor.clone()).await;
        }
        for record in &self.records {
            records.upsert(record.id.clone()).await;
            if record.deleted {
                records.soft_delete(&record.id).await;
            }
        }
        info!(
            actors = self.actors.len(),
            records = self.records.len(),
            "seed installed"
        );
    }
}
