//! In-process relational store with natural-key uniqueness and fault injection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};
use uuid::Uuid;

use super::{compare_values, Filter, Query, RemoteError, RemoteResult, RemoteStore, Row};
use crate::util::now_rfc3339;

#[derive(Default)]
struct MemoryState {
    tables: BTreeMap<String, Vec<Row>>,
    unique_keys: HashMap<String, Vec<Vec<String>>>,
    failing_tables: HashMap<String, RemoteError>,
    scheduled_failures: HashMap<String, VecDeque<RemoteError>>,
    offline: bool,
    calls: usize,
}

impl MemoryState {
    fn check_failure(&mut self, table: &str) -> RemoteResult<()> {
        self.calls += 1;
        if self.offline {
            return Err(RemoteError::Network("network is unreachable".to_string()));
        }
        if let Some(error) = self
            .scheduled_failures
            .get_mut(table)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        if let Some(error) = self.failing_tables.get(table) {
            return Err(error.clone());
        }
        Ok(())
    }

    fn has_conflict(&self, table: &str, candidate: &Row) -> bool {
        let Some(rows) = self.tables.get(table) else {
            return false;
        };
        let declared = self.unique_keys.get(table).into_iter().flatten().cloned();
        let mut key_sets = std::iter::once(vec!["id".to_string()]).chain(declared);

        key_sets.any(|columns| {
            columns.iter().all(|column| candidate.get(column).is_some())
                && rows.iter().any(|row| {
                    columns
                        .iter()
                        .all(|column| row.get(column) == candidate.get(column))
                })
        })
    }

    fn insert_row(&mut self, table: &str, mut row: Row) -> RemoteResult<Row> {
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::now_v7().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(now_rfc3339()));

        if self.has_conflict(table, &row) {
            return Err(unique_violation(table));
        }

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    fn upsert_row(&mut self, table: &str, row: Row, on_conflict: Option<&str>) -> RemoteResult<Row> {
        let columns: Vec<&str> = on_conflict
            .unwrap_or("id")
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .collect();

        let existing = self.tables.get_mut(table).and_then(|rows| {
            rows.iter_mut().find(|current| {
                columns.iter().all(|column| {
                    row.get(*column).is_some() && current.get(*column) == row.get(*column)
                })
            })
        });

        match existing {
            Some(current) => {
                for (column, value) in row {
                    if column != "id" && column != "created_at" {
                        current.insert(column, value);
                    }
                }
                current.insert("updated_at".to_string(), Value::String(now_rfc3339()));
                Ok(current.clone())
            }
            None => self.insert_row(table, row),
        }
    }
}

fn unique_violation(table: &str) -> RemoteError {
    RemoteError::Api {
        status: Some(409),
        body: json!({
            "message": format!("duplicate key value violates unique constraint on {table}"),
            "code": "23505",
        }),
    }
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(column, value)| row.get(column) == Some(value))
}

/// Relational store kept in memory.
///
/// Rows receive a server-style `id` and `created_at` on insert. Unique keys
/// declared with [`MemoryStore::with_unique_key`] reject duplicate inserts and
/// make upserts on those columns update in place.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a uniqueness constraint over `columns` for `table`.
    #[must_use]
    pub fn with_unique_key(self, table: &str, columns: &[&str]) -> Self {
        self.lock()
            .unique_keys
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|column| (*column).to_string()).collect());
        self
    }

    /// Unique keys used by the backend schema for the coaching tables.
    #[must_use]
    pub fn with_coaching_schema(self) -> Self {
        self.with_unique_key("daily_checkins", &["user_id", "checkin_date"])
            .with_unique_key("daily_contact_logs", &["user_id", "contact_id", "log_date"])
            .with_unique_key("user_item_notes", &["user_id", "item_ref"])
            .with_unique_key("saved_items", &["user_id", "item_id"])
            .with_unique_key("question_votes", &["question_id", "user_id"])
    }

    /// Every call fails with a network error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Every call on `table` fails with `error` until cleared.
    pub fn fail_table(&self, table: &str, error: RemoteError) {
        self.lock().failing_tables.insert(table.to_string(), error);
    }

    /// The next call on `table` fails with `error`.
    pub fn fail_next(&self, table: &str, error: RemoteError) {
        self.lock()
            .scheduled_failures
            .entry(table.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failing_tables.clear();
        state.scheduled_failures.clear();
    }

    /// Seed a row as-is, bypassing fault injection.
    pub fn seed(&self, table: &str, row: Row) -> RemoteResult<Row> {
        self.lock().insert_row(table, row)
    }

    /// Snapshot of the rows stored in `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Number of remote calls attempted, failed ones included.
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteStore for MemoryStore {
    async fn insert(&self, table: &str, rows: Vec<Row>) -> RemoteResult<Vec<Row>> {
        let mut state = self.lock();
        state.check_failure(table)?;
        rows.into_iter()
            .map(|row| state.insert_row(table, row))
            .collect()
    }

    async fn update(&self, table: &str, data: Row, filter: Filter) -> RemoteResult<Vec<Row>> {
        let mut state = self.lock();
        state.check_failure(table)?;

        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_filter(row, &filter)) {
            for (column, value) in &data {
                row.insert(column.clone(), value.clone());
            }
            row.insert("updated_at".to_string(), Value::String(now_rfc3339()));
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        on_conflict: Option<&str>,
    ) -> RemoteResult<Vec<Row>> {
        let mut state = self.lock();
        state.check_failure(table)?;
        rows.into_iter()
            .map(|row| state.upsert_row(table, row, on_conflict))
            .collect()
    }

    async fn delete(&self, table: &str, filter: Filter) -> RemoteResult<Vec<Row>> {
        let mut state = self.lock();
        state.check_failure(table)?;

        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let (removed, kept): (Vec<Row>, Vec<Row>) = rows
            .drain(..)
            .partition(|row| matches_filter(row, &filter));
        *rows = kept;
        Ok(removed)
    }

    async fn select(&self, table: &str, query: Query) -> RemoteResult<Vec<Row>> {
        let mut state = self.lock();
        state.check_failure(table)?;

        let mut rows: Vec<Row> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|left, right| {
                let ordering = match (left.get(&order.column), right.get(&order.column)) {
                    (Some(left), Some(right)) => {
                        compare_values(left, right).unwrap_or(std::cmp::Ordering::Equal)
                    }
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, table: &str, query: Query) -> RemoteResult<usize> {
        let mut state = self.lock();
        state.check_failure(table)?;

        Ok(state
            .tables
            .get(table)
            .map_or(0, |rows| rows.iter().filter(|row| query.matches(row)).count()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::into_row;

    #[tokio::test]
    async fn upsert_on_natural_key_updates_in_place() {
        let store = MemoryStore::new().with_coaching_schema();
        let first = into_row(json!({
            "user_id": "u1",
            "checkin_date": "2026-03-04",
            "overall_score": 3,
        }));
        let second = into_row(json!({
            "user_id": "u1",
            "checkin_date": "2026-03-04",
            "overall_score": 5,
        }));

        let created = store
            .upsert("daily_checkins", vec![first], Some("user_id,checkin_date"))
            .await
            .unwrap();
        let updated = store
            .upsert("daily_checkins", vec![second], Some("user_id,checkin_date"))
            .await
            .unwrap();

        let rows = store.rows("daily_checkins");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["overall_score"], json!(5));
        assert_eq!(created[0]["id"], updated[0]["id"]);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_natural_key() {
        let store = MemoryStore::new().with_coaching_schema();
        let vote = into_row(json!({ "question_id": "q", "user_id": "u", "vote": "up" }));

        store.insert("question_votes", vec![vote.clone()]).await.unwrap();
        let error = store.insert("question_votes", vec![vote]).await.unwrap_err();

        assert!(matches!(error, RemoteError::Api { status: Some(409), .. }));
        assert_eq!(store.rows("question_votes").len(), 1);
    }

    #[tokio::test]
    async fn select_filters_orders_and_pages() {
        let store = MemoryStore::new();
        let seeded = [
            ("2026-03-01", "u1"),
            ("2026-03-03", "u1"),
            ("2026-03-02", "u1"),
            ("2026-03-02", "u2"),
        ];
        for (date, user) in seeded {
            let row = into_row(json!({ "user_id": user, "checkin_date": date }));
            store.seed("daily_checkins", row).unwrap();
        }

        let rows = store
            .select(
                "daily_checkins",
                Query::new()
                    .eq("user_id", "u1")
                    .order("checkin_date", false)
                    .range(1, 5),
            )
            .await
            .unwrap();

        let dates: Vec<_> = rows.iter().map(|row| row["checkin_date"].clone()).collect();
        assert_eq!(dates, vec![json!("2026-03-02"), json!("2026-03-01")]);
    }

    #[tokio::test]
    async fn count_ignores_paging_and_honours_conditions() {
        let store = MemoryStore::new();
        for user in ["u1", "u1", "u2"] {
            store
                .seed("daily_checkins", into_row(json!({ "user_id": user })))
                .unwrap();
        }

        let query = Query::new().eq("user_id", "u1").limit(1);
        assert_eq!(store.count("daily_checkins", query).await.unwrap(), 2);
        assert_eq!(store.count("missing", Query::new()).await.unwrap(), 0);

        store.set_offline(true);
        assert!(store.count("daily_checkins", Query::new()).await.is_err());
    }

    #[tokio::test]
    async fn injected_failures_are_reported_and_counted() {
        let store = MemoryStore::new();
        store.fail_next("notes", RemoteError::Network("timeout".to_string()));

        assert!(store.select("notes", Query::new()).await.is_err());
        assert!(store.select("notes", Query::new()).await.is_ok());

        store.set_offline(true);
        assert!(store
            .select("notes", Query::new())
            .await
            .unwrap_err()
            .is_network());
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn update_and_delete_use_match_filter() {
        let store = MemoryStore::new();
        store
            .seed("contacts", into_row(json!({ "id": "c1", "name": "Ana" })))
            .unwrap();
        store
            .seed("contacts", into_row(json!({ "id": "c2", "name": "Ben" })))
            .unwrap();

        let updated = store
            .update(
                "contacts",
                into_row(json!({ "name": "Ana M." })),
                into_row(json!({ "id": "c1" })),
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);

        let removed = store
            .delete("contacts", into_row(json!({ "id": "c2" })))
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);

        let rows = store.rows("contacts");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Ana M."));
    }
}
