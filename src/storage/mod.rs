pub mod lease_store;
pub mod persistence;
pub mod record_store;

pub use lease_store::{LeaseEntry, LeaseStore};
pub use persistence::{load_leases, save_leases};
pub use record_store::{InMemoryRecordStore, RecordState, RecordStore};
