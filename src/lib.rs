// ============================================================================
// invsync Library
// ============================================================================

//! Lease-based edit locks for shared inventory records, plus the client-side
//! reconciliation that folds authoritative snapshots into a local cache.
//!
//! ```
//! use invsync::{ActorDirectory, AuthContext, InMemoryRecordStore, LeaseKey, LeaseStore,
//!     LockConfig, LockService, ManualClock};
//! use invsync::core::{Actor, RecordId};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let records = InMemoryRecordStore::with_live([RecordId::new("asset-1"), RecordId::new("serial")]);
//! let service = LockService::new(
//!     Arc::new(LeaseStore::new()),
//!     Arc::new(records),
//!     Arc::new(ActorDirectory::new()),
//!     Arc::new(ManualClock::default()),
//!     LockConfig::default(),
//! )
//! .unwrap();
//!
//! let alice = AuthContext::authenticated(Actor::new("u-alice", "alice@example.com"));
//! let lease = service.acquire(&alice, &LeaseKey::field("asset-1", "serial")).await.unwrap();
//! assert_eq!(lease.holder.as_str(), "u-alice");
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod lock;
pub mod model;
pub mod reconcile;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use auth::{ActorDirectory, ActorResolver, AuthContext};
pub use config::LockConfig;
pub use core::{
    Actor, ActorId, Clock, FieldId, FieldValue, InvError, Lease, LeaseKey, LeaseView, LockError,
    LockResult, ManualClock, RecordId, Result, SystemClock,
};
pub use lock::{EditSession, LockResponse, LockService, SessionExit, SessionReport};
pub use model::{AssetRecord, FieldDefinition, FieldType};
pub use reconcile::{ClientMirror, LocalCache, LockView, Snapshot, Validator, reconcile};
pub use storage::{InMemoryRecordStore, LeaseStore, RecordStore};
