//! Saved items. Every write is keyed by `user_id + item_id`, so all of
//! them are queued while offline.

use serde_json::{json, Value};

use super::SAVED_ITEMS;
use crate::auth::SessionProvider;
use crate::client::{decode_all, to_row, SaveStatus, VibeClient};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{Mutation, SavedItem};
use crate::remote::{into_row, Query, RemoteStore};
use crate::storage::KeyValueStore;
use crate::util::{normalize_text_option, now_rfc3339};

const SAVED_ITEM_CONFLICT: &str = "user_id,item_id";

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    /// Most recently saved first.
    pub async fn saved_items(&self) -> Result<Vec<SavedItem>> {
        let user = self.require_user().await?;
        decode_all(
            self.select(
                SAVED_ITEMS,
                Query::new()
                    .eq("user_id", user.id)
                    .order("saved_at", false),
            )
            .await?,
        )
    }

    pub async fn save_item(&self, item_id: &str, note: Option<String>) -> Result<SaveStatus> {
        let user = self.require_user().await?;
        let item_id = required_item(item_id)?;

        let payload = to_row(&json!({
            "user_id": user.id,
            "item_id": item_id,
            "note": normalize_text_option(note),
            "saved_at": now_rfc3339(),
        }))?;
        let mutation = Mutation::upsert(SAVED_ITEMS, payload, Some(SAVED_ITEM_CONFLICT))?;
        Ok(self.write_or_defer(mutation).await?.into())
    }

    pub async fn unsave_item(&self, item_id: &str) -> Result<SaveStatus> {
        let user = self.require_user().await?;
        let item_id = required_item(item_id)?;

        let filter = into_row(json!({ "user_id": user.id, "item_id": item_id }));
        Ok(self
            .write_or_defer(Mutation::delete(SAVED_ITEMS, filter)?)
            .await?
            .into())
    }

    /// `false` when signed out.
    pub async fn is_item_saved(&self, item_id: &str) -> Result<bool> {
        let Some(user) = self.optional_user().await? else {
            return Ok(false);
        };
        let rows = self
            .select(
                SAVED_ITEMS,
                Query::new()
                    .eq("user_id", user.id)
                    .eq("item_id", item_id.trim())
                    .limit(1),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Replace the note on a saved item; `None` clears it.
    pub async fn update_saved_note(&self, item_id: &str, note: Option<String>) -> Result<SaveStatus> {
        let user = self.require_user().await?;
        let item_id = required_item(item_id)?;

        let note = normalize_text_option(note).map_or(Value::Null, Value::String);
        let data = into_row(json!({ "note": note }));
        let filter = into_row(json!({ "user_id": user.id, "item_id": item_id }));
        Ok(self
            .write_or_defer(Mutation::update(SAVED_ITEMS, data, filter)?)
            .await?
            .into())
    }
}

fn required_item(item_id: &str) -> Result<&str> {
    let item_id = item_id.trim();
    if item_id.is_empty() {
        Err(Error::InvalidInput("Item id is required".into()))
    } else {
        Ok(item_id)
    }
}
