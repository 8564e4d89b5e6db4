use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome taxonomy of the lock operations.
///
/// Serialized as the bare variant name (`"Conflict"`, `"NotHeld"`, ...), which is
/// the `error` field of the wire-level lock response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockError {
    #[error("No authenticated actor")]
    NotAuthenticated,

    #[error("Record not found or deleted")]
    NotFound,

    #[error("Key is locked by another actor")]
    Conflict,

    #[error("Lease is not held by the caller")]
    NotHeld,
}

impl LockError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NotAuthenticated",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::NotHeld => "NotHeld",
        }
    }
}

#[derive(Error, Debug)]
pub enum InvError {
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, InvError>;

/// Result of a single lock operation. Callers must inspect it explicitly.
pub type LockResult<T> = std::result::Result<T, LockError>;

impl From<std::io::Error> for InvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for InvError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Storage(err.to_string())
    }
}
