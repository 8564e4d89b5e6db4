pub mod clock;
pub mod error;
pub mod types;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{InvError, LockError, LockResult, Result};
pub use types::{Actor, ActorId, FieldId, Lease, LeaseKey, LeaseView, RecordId};
pub use value::FieldValue;
