//! Per-item notes and photos

use serde::{Deserialize, Serialize};

use super::RecordId;

/// A user's note on a coaching item; unique on `user_id + item_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserItemNote {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    pub item_ref: String,
    #[serde(default)]
    pub note_text: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl UserItemNote {
    pub fn has_text(&self) -> bool {
        self.note_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserItemPhoto {
    #[serde(default)]
    pub id: RecordId,
    pub note_id: String,
    pub photo_url: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserItemNoteWithPhotos {
    #[serde(flatten)]
    pub note: UserItemNote,
    pub photos: Vec<UserItemPhoto>,
}
