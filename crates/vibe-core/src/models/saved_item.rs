//! Saved ("it worked") items

use serde::{Deserialize, Serialize};

use super::RecordId;

/// Bookmark of a coaching item; unique on `user_id + item_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    pub item_id: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub saved_at: Option<String>,
}
