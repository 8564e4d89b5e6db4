//! Lease table persistence
//!
//! The table is written as one versioned MessagePack file. Writes go to a
//! temporary file in the same directory which is then renamed over the target,
//! so a crash never leaves a half-written table behind.

use crate::core::{InvError, Lease, Result};
use crate::storage::LeaseStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const LEASE_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaseFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub leases: Vec<Lease>,
}

/// Writes every row of `store` to `path`. Returns the number of rows written.
pub async fn save_leases<P: AsRef<Path>>(store: &LeaseStore, path: P) -> Result<usize> {
    let path = path.as_ref();
    let file = LeaseFile {
        version: LEASE_FILE_VERSION,
        saved_at: Utc::now(),
        leases: store.export().await,
    };
    let count = file.leases.len();
    write_atomic(path, &file)?;
    info!("Saved {} lease rows to {}", count, path.display());
    Ok(count)
}

/// Loads `path` into `store`, replacing its contents. A missing file is an
/// empty table.
pub async fn load_leases<P: AsRef<Path>>(store: &LeaseStore, path: P) -> Result<usize> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No lease file at {}, starting empty", path.display());
        return Ok(0);
    }

    let file = read_file(path)?;
    if file.version != LEASE_FILE_VERSION {
        return Err(InvError::Serialization(format!(
            "Unsupported lease file version {} (expected {})",
            file.version, LEASE_FILE_VERSION
        )));
    }

    let now = Utc::now();
    let expired = file.leases.iter().filter(|l| !l.is_active(now)).count();
    if expired > 0 {
        warn!(
            "Lease file {} holds {} expired rows; they will be superseded on next acquire",
            path.display(),
            expired
        );
    }

    let count = file.leases.len();
    store.restore(file.leases).await;
    info!("Loaded {} lease rows from {}", count, path.display());
    Ok(count)
}

fn write_atomic(path: &Path, file: &LeaseFile) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| InvError::Io(format!("Failed to create lease directory: {}", e)))?;

    let temp = NamedTempFile::new_in(dir)
        .map_err(|e| InvError::Io(format!("Failed to create temp lease file: {}", e)))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        rmp_serde::encode::write_named(&mut writer, file)
            .map_err(|e| InvError::Serialization(e.to_string()))?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| InvError::Io(format!("Failed to persist lease file: {}", e)))?;
    Ok(())
}

fn read_file(path: &Path) -> Result<LeaseFile> {
    let file = File::open(path)?;
    rmp_serde::from_read(BufReader::new(file)).map_err(|e| InvError::Serialization(e.to_string()))
}
