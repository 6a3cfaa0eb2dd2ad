//! Identity of a record that may not have reached the backend yet

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned identity, or the placeholder state of an optimistic
/// result whose write is still queued.
///
/// Serializes as the id string, or `null` while pending, so pending records
/// can never be mistaken for a real key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum RecordId {
    #[default]
    Pending,
    Persisted(String),
}

impl RecordId {
    pub fn persisted(id: impl Into<String>) -> Self {
        Self::Persisted(id.into())
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The backend id, if the record has been written.
    pub fn as_persisted(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Persisted(id) => Some(id),
        }
    }
}

impl From<Option<String>> for RecordId {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Pending, Self::Persisted)
    }
}

impl From<RecordId> for Option<String> {
    fn from(value: RecordId) -> Self {
        match value {
            RecordId::Pending => None,
            RecordId::Persisted(id) => Some(id),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Persisted(id) => write!(f, "{id}"),
        }
    }
}
