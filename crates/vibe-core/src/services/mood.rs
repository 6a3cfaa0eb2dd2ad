//! Boss mood entries.

use std::collections::BTreeMap;

use serde_json::json;

use super::{group_by, MOOD_ENTRIES, MOOD_SCALES};
use crate::auth::SessionProvider;
use crate::client::{decode_all, single, to_row, VibeClient};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{BossMoodEntry, MoodEntryWithScales, MoodInput, MoodTrendPoint, Mutation};
use crate::remote::{Query, RemoteStore, Row};
use crate::storage::KeyValueStore;

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    /// Record a mood entry with its scales. Requires a connection.
    pub async fn save_mood_entry(&self, input: MoodInput) -> Result<MoodEntryWithScales> {
        let user = self.require_user().await?;
        let input = input.normalized()?;
        self.require_online().await?;

        let payload = to_row(&json!({
            "user_id": user.id,
            "overall_insight": input.overall_insight,
        }))?;
        let rows = self.execute(&Mutation::insert(MOOD_ENTRIES, payload)?).await?;
        let entry: BossMoodEntry = single(rows, MOOD_ENTRIES)?;
        let entry_id = entry
            .id
            .as_persisted()
            .ok_or_else(|| Error::Storage("Saved mood entry has no id".into()))?;

        let scale_rows: Vec<Row> = input
            .scales
            .iter()
            .map(|scale| {
                to_row(&json!({
                    "entry_id": entry_id,
                    "scale_name": scale.scale_name,
                    "value": scale.value,
                }))
            })
            .collect::<Result<_>>()?;
        let scales = decode_all(self.insert_rows(MOOD_SCALES, scale_rows).await?)?;

        Ok(MoodEntryWithScales { entry, scales })
    }

    /// Newest first.
    pub async fn mood_history(&self, limit: usize) -> Result<Vec<MoodEntryWithScales>> {
        let user = self.require_user().await?;
        let entries: Vec<BossMoodEntry> = decode_all(
            self.select(
                MOOD_ENTRIES,
                Query::new()
                    .eq("user_id", user.id)
                    .order("created_at", false)
                    .limit(limit),
            )
            .await?,
        )?;

        let ids: Vec<String> = entries
            .iter()
            .filter_map(|entry| entry.id.as_persisted().map(str::to_string))
            .collect();
        let mut scales = if ids.is_empty() {
            BTreeMap::new()
        } else {
            group_by(
                self.select(MOOD_SCALES, Query::new().is_in("entry_id", ids))
                    .await?,
                "entry_id",
            )
        };

        entries
            .into_iter()
            .map(|entry| {
                let rows = entry
                    .id
                    .as_persisted()
                    .and_then(|id| scales.remove(id))
                    .unwrap_or_default();
                Ok(MoodEntryWithScales {
                    entry,
                    scales: decode_all(rows)?,
                })
            })
            .collect()
    }

    /// The last `days` entries, oldest first.
    pub async fn mood_trends(&self, days: usize) -> Result<Vec<MoodTrendPoint>> {
        let history = self.mood_history(days).await?;
        Ok(history.iter().rev().map(MoodTrendPoint::from).collect())
    }
}
