//! Contacts and daily contact logs

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl ContactInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn normalized(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(Error::InvalidInput("Contact name is required".into()));
        }
        self.relationship = normalize_text_option(self.relationship);
        self.notes = normalize_text_option(self.notes);
        self.photo_url = normalize_photo_url(self.photo_url)?;
        Ok(self)
    }
}

/// Partial contact update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl ContactUpdate {
    pub fn normalized(mut self) -> Result<Self> {
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidInput("Contact name must not be empty".into()));
            }
            self.name = Some(name.to_string());
        }
        self.photo_url = normalize_photo_url(self.photo_url)?;
        let untouched = self.name.is_none()
            && self.relationship.is_none()
            && self.photo_url.is_none()
            && self.notes.is_none()
            && self.sort_order.is_none();
        if untouched {
            return Err(Error::InvalidInput("Contact update has no fields".into()));
        }
        Ok(self)
    }
}

fn normalize_photo_url(value: Option<String>) -> Result<Option<String>> {
    let Some(url) = normalize_text_option(value) else {
        return Ok(None);
    };
    if !is_http_url(&url) {
        return Err(Error::InvalidInput(
            "Contact photo URL must include http:// or https://".into(),
        ));
    }
    Ok(Some(url))
}

/// "Did I connect with this person today"; unique on
/// `user_id + contact_id + log_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyContactLog {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    pub contact_id: String,
    pub log_date: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: String,
}
