use crate::core::{Lease, LockError, LockResult};
use serde::{Deserialize, Serialize};

/// Wire shape of a lock operation outcome:
/// `{ "success": true, "lease": {..} }` or `{ "success": false, "error": "Conflict" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LockError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
}

impl LockResponse {
    pub fn ok(lease: Option<Lease>) -> Self {
        Self {
            success: true,
            error: None,
            lease,
        }
    }

    pub fn failed(error: LockError) -> Self {
        Self {
            success: false,
            error: Some(error),
            lease: None,
        }
    }
}

impl From<LockResult<Lease>> for LockResponse {
    fn from(result: LockResult<Lease>) -> Self {
        match result {
            Ok(lease) => Self::ok(Some(lease)),
            Err(err) => Self::failed(err),
        }
    }
}

impl From<LockResult<()>> for LockResponse {
    fn from(result: LockResult<()>) -> Self {
        match result {
            Ok(()) => Self::ok(None),
            Err(err) => Self::failed(err),
        }
    }
}
