use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque id of a record (asset or field definition).
    RecordId
);
string_id!(
    /// Id of a field definition, as referenced from asset metadata.
    FieldId
);
string_id!(ActorId);

impl FieldId {
    /// Field definitions are records too; definition-level locks key on this id.
    pub fn as_record_id(&self) -> RecordId {
        RecordId(self.0.clone())
    }
}

/// Authenticated identity, used only for attribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Human-facing identity shown as "locked by" (e.g. an email address).
    pub display: String,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, display: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: display.into(),
        }
    }
}

/// What a lease guards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawLeaseKey", into = "RawLeaseKey")]
pub enum LeaseKey {
    /// Definition-level lock: the record as a whole (a field's own schema).
    Record(RecordId),
    /// Value-level lock: one field's value within one record.
    Field(RecordId, FieldId),
}

impl LeaseKey {
    pub fn record(record_id: impl Into<RecordId>) -> Self {
        Self::Record(record_id.into())
    }

    pub fn field(record_id: impl Into<RecordId>, field_id: impl Into<FieldId>) -> Self {
        Self::Field(record_id.into(), field_id.into())
    }

    pub fn record_id(&self) -> &RecordId {
        match self {
            Self::Record(id) | Self::Field(id, _) => id,
        }
    }

    pub fn field_id(&self) -> Option<&FieldId> {
        match self {
            Self::Record(_) => None,
            Self::Field(_, field) => Some(field),
        }
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(id) => write!(f, "{}", id),
            Self::Field(id, field) => write!(f, "{}/{}", id, field),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeaseKey {
    record_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_id: Option<FieldId>,
}

impl From<RawLeaseKey> for LeaseKey {
    fn from(raw: RawLeaseKey) -> Self {
        match raw.field_id {
            Some(field) => Self::Field(raw.record_id, field),
            None => Self::Record(raw.record_id),
        }
    }
}

impl From<LeaseKey> for RawLeaseKey {
    fn from(key: LeaseKey) -> Self {
        match key {
            LeaseKey::Record(record_id) => Self {
                record_id,
                field_id: None,
            },
            LeaseKey::Field(record_id, field_id) => Self {
                record_id,
                field_id: Some(field_id),
            },
        }
    }
}

/// One row of the lease table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub key: LeaseKey,
    pub holder: ActorId,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Stamped on every fresh grant; unchanged by renew or self-reacquire.
    pub fencing_token: u64,
}

impl Lease {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_held_by(&self, actor: &ActorId) -> bool {
        &self.holder == actor
    }
}

/// An active lease as published to clients, with the holder's display identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseView {
    pub key: LeaseKey,
    pub holder: Actor,
    pub expires_at: DateTime<Utc>,
}
