pub mod heartbeat;
pub mod response;
pub mod service;

pub use heartbeat::{EditSession, HeartbeatStats, SessionExit, SessionReport};
pub use response::LockResponse;
pub use service::LockService;
