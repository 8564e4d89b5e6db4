//! Client-side reconciliation of authoritative snapshots into a local cache.

pub mod cache;
pub mod merge;
pub mod mirror;
pub mod snapshot;
pub mod validation;

pub use cache::{CachedAsset, LocalCache, LockView};
pub use merge::{ReconcileOutcome, ReconcileStats, reconcile};
pub use mirror::ClientMirror;
pub use snapshot::Snapshot;
pub use validation::{FieldRule, ValidationIssue, ValidationReport, Validator};
