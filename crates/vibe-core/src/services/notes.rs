//! Per-item notes and their photos.

use std::collections::BTreeSet;

use serde_json::json;

use super::{ITEM_NOTES, ITEM_PHOTOS};
use crate::auth::SessionProvider;
use crate::client::{decode_all, single, to_row, SaveStatus, VibeClient};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{Mutation, UserItemNote, UserItemNoteWithPhotos, UserItemPhoto};
use crate::remote::{Query, RemoteStore};
use crate::storage::KeyValueStore;
use crate::util::now_rfc3339;

const NOTE_CONFLICT: &str = "user_id,item_ref";

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    /// The note for `item_ref`, created empty on first access.
    pub async fn get_or_create_note(&self, item_ref: &str) -> Result<UserItemNoteWithPhotos> {
        let user = self.require_user().await?;
        let item_ref = required_ref(item_ref)?;

        let existing: Vec<UserItemNote> = decode_all(
            self.select(
                ITEM_NOTES,
                Query::new()
                    .eq("user_id", user.id.as_str())
                    .eq("item_ref", item_ref)
                    .limit(1),
            )
            .await?,
        )?;

        if let Some(note) = existing.into_iter().next() {
            let photos = match note.id.as_persisted() {
                Some(note_id) => decode_all(
                    self.select(
                        ITEM_PHOTOS,
                        Query::new().eq("note_id", note_id).order("sort_order", true),
                    )
                    .await?,
                )?,
                None => Vec::new(),
            };
            return Ok(UserItemNoteWithPhotos { note, photos });
        }

        self.require_online().await?;
        let payload = to_row(&json!({ "user_id": user.id, "item_ref": item_ref }))?;
        let rows = self.execute(&Mutation::insert(ITEM_NOTES, payload)?).await?;
        tracing::debug!(item_ref, "Created item note");
        Ok(UserItemNoteWithPhotos {
            note: single(rows, ITEM_NOTES)?,
            photos: Vec::new(),
        })
    }

    /// Replace the note text for `item_ref`; queued while offline.
    pub async fn save_note_text(&self, item_ref: &str, text: &str) -> Result<SaveStatus> {
        let user = self.require_user().await?;
        let item_ref = required_ref(item_ref)?;

        let payload = to_row(&json!({
            "user_id": user.id,
            "item_ref": item_ref,
            "note_text": text,
            "updated_at": now_rfc3339(),
        }))?;
        let mutation = Mutation::upsert(ITEM_NOTES, payload, Some(NOTE_CONFLICT))?;
        Ok(self.write_or_defer(mutation).await?.into())
    }

    /// Item refs that carry note text or at least one photo.
    pub async fn items_with_content(&self) -> Result<BTreeSet<String>> {
        let Some(user) = self.optional_user().await? else {
            return Ok(BTreeSet::new());
        };

        let notes: Vec<UserItemNote> = decode_all(
            self.select(ITEM_NOTES, Query::new().eq("user_id", user.id))
                .await?,
        )?;
        let note_ids: Vec<String> = notes
            .iter()
            .filter_map(|note| note.id.as_persisted().map(str::to_string))
            .collect();

        let photographed: BTreeSet<String> = if note_ids.is_empty() {
            BTreeSet::new()
        } else {
            let photos: Vec<UserItemPhoto> = decode_all(
                self.select(ITEM_PHOTOS, Query::new().is_in("note_id", note_ids))
                    .await?,
            )?;
            photos.into_iter().map(|photo| photo.note_id).collect()
        };

        Ok(notes
            .into_iter()
            .filter(|note| {
                note.has_text()
                    || note
                        .id
                        .as_persisted()
                        .is_some_and(|id| photographed.contains(id))
            })
            .map(|note| note.item_ref)
            .collect())
    }
}

fn required_ref(item_ref: &str) -> Result<&str> {
    let item_ref = item_ref.trim();
    if item_ref.is_empty() {
        Err(Error::InvalidInput("Item reference is required".into()))
    } else {
        Ok(item_ref)
    }
}
