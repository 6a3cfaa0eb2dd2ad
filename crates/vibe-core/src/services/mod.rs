//! Per-entity read and write services on [`crate::VibeClient`].
//!
//! Writes keyed by a natural-key upsert go through
//! `VibeClient::write_or_defer` and come back as pending records while
//! offline. Inserts and toggles need a connection. Coaching content is
//! read-only.

mod checkins;
mod coaching;
mod contacts;
mod mood;
mod notes;
mod questions;
mod saved_items;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::remote::Row;

pub(crate) const CHECKINS: &str = "daily_checkins";
pub(crate) const CHECKIN_ANSWERS: &str = "checkin_answers";
pub(crate) const PROFILES: &str = "profiles";
pub(crate) const MOOD_ENTRIES: &str = "boss_mood_entries";
pub(crate) const MOOD_SCALES: &str = "boss_mood_scales";
pub(crate) const CONTACTS: &str = "contacts";
pub(crate) const CONTACT_LOGS: &str = "daily_contact_logs";
pub(crate) const ITEM_NOTES: &str = "user_item_notes";
pub(crate) const ITEM_PHOTOS: &str = "user_item_photos";
pub(crate) const SAVED_ITEMS: &str = "saved_items";
pub(crate) const QUESTIONS: &str = "anonymous_questions";
pub(crate) const ANSWERS: &str = "anonymous_answers";
pub(crate) const VOTES: &str = "question_votes";
pub(crate) const COACHING_CATEGORIES: &str = "coaching_categories";
pub(crate) const COACHING_SECTIONS: &str = "coaching_sections";
pub(crate) const COACHING_ITEMS: &str = "coaching_items";
pub(crate) const CHECKIN_QUESTIONS: &str = "checkin_questions";
pub(crate) const QUESTION_TIPS: &str = "checkin_question_tips";
pub(crate) const BEHAVIOR_SLIDERS: &str = "behavior_sliders";
pub(crate) const SLIDER_RECS: &str = "behavior_slider_recs";

/// Group child rows by a string foreign-key column.
fn group_by(rows: Vec<Row>, column: &str) -> BTreeMap<String, Vec<Row>> {
    let mut groups: BTreeMap<String, Vec<Row>> = BTreeMap::new();
    for row in rows {
        if let Some(Value::String(key)) = row.get(column) {
            groups.entry(key.clone()).or_default().push(row);
        }
    }
    groups
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use crate::auth::StaticSession;
    use crate::client::VibeClient;
    use crate::connectivity::ConnectivityMonitor;
    use crate::queue::MutationQueue;
    use crate::remote::MemoryStore;
    use crate::retry::RetryPolicy;
    use crate::storage::MemoryKeyValueStore;

    pub type TestClient =
        VibeClient<MemoryStore, MemoryKeyValueStore, ConnectivityMonitor, StaticSession>;

    pub const USER: &str = "user-1";

    /// Signed-in client over an empty coaching schema, without retry delays.
    pub fn client() -> TestClient {
        let queue = MutationQueue::new(Arc::new(MemoryKeyValueStore::new()))
            .with_retry_policy(RetryPolicy::none());
        VibeClient::new(
            Arc::new(MemoryStore::new().with_coaching_schema()),
            queue,
            Arc::new(ConnectivityMonitor::new(true)),
            Arc::new(StaticSession::signed_in(USER)),
        )
    }

    pub fn offline_client() -> TestClient {
        let client = client();
        client.connectivity().set_connected(false);
        client
    }

    pub fn signed_out_client() -> TestClient {
        let queue = MutationQueue::new(Arc::new(MemoryKeyValueStore::new()))
            .with_retry_policy(RetryPolicy::none());
        VibeClient::new(
            Arc::new(MemoryStore::new().with_coaching_schema()),
            queue,
            Arc::new(ConnectivityMonitor::new(true)),
            Arc::new(StaticSession::signed_out()),
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::remote::into_row;

    #[test]
    fn group_by_skips_rows_without_the_key() {
        let rows = vec![
            into_row(json!({ "entry_id": "a", "v": 1 })),
            into_row(json!({ "entry_id": "b", "v": 2 })),
            into_row(json!({ "entry_id": "a", "v": 3 })),
            into_row(json!({ "v": 4 })),
        ];

        let groups = group_by(rows, "entry_id");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["a"].len(), 2);
        assert_eq!(groups["b"][0]["v"], json!(2));
    }
}
