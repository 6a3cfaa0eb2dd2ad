//! Remote relational store seam.
//!
//! Every table is reached through the same six calls. Each resolves to the
//! rows (or row count) the backend returned or a [`RemoteError`] carrying the
//! raw error payload, which [`crate::api_error`] classifies.

mod memory;
mod postgrest;

use std::cmp::Ordering;
use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::MutationKind;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub(crate) use postgrest::{map_transport_error, parse_error_body};

/// One backend row, a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Equality conditions used to locate rows for update/delete.
pub type Filter = Map<String, Value>;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Raw failure reported by the remote store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// The request never reached the backend
    #[error("Network error: {0}")]
    Network(String),
    /// The backend answered with an error payload
    #[error("Remote store error (status {status:?}): {body}")]
    Api { status: Option<u16>, body: Value },
}

impl RemoteError {
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Failures worth retrying: no link, timeouts, throttling, server faults.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => matches!(status, Some(408 | 429 | 500..=599)),
        }
    }
}

/// Uniform per-table call shape of the remote store.
pub trait RemoteStore: Send + Sync {
    fn insert(
        &self,
        table: &str,
        rows: Vec<Row>,
    ) -> impl Future<Output = RemoteResult<Vec<Row>>> + Send;

    fn update(
        &self,
        table: &str,
        data: Row,
        filter: Filter,
    ) -> impl Future<Output = RemoteResult<Vec<Row>>> + Send;

    /// Insert-or-update keyed by the comma-separated `on_conflict` columns
    /// (primary key when `None`).
    fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        on_conflict: Option<&str>,
    ) -> impl Future<Output = RemoteResult<Vec<Row>>> + Send;

    fn delete(
        &self,
        table: &str,
        filter: Filter,
    ) -> impl Future<Output = RemoteResult<Vec<Row>>> + Send;

    fn select(
        &self,
        table: &str,
        query: Query,
    ) -> impl Future<Output = RemoteResult<Vec<Row>>> + Send;

    /// Number of rows matching the query's conditions, without transferring
    /// them. Ordering and paging are ignored.
    fn count(&self, table: &str, query: Query) -> impl Future<Output = RemoteResult<usize>> + Send;
}

/// Issue the remote call described by a mutation.
pub async fn apply<R: RemoteStore>(
    remote: &R,
    table: &str,
    kind: &MutationKind,
) -> RemoteResult<Vec<Row>> {
    match kind {
        MutationKind::Insert { data } => remote.insert(table, vec![data.clone()]).await,
        MutationKind::Update { data, filter } => {
            remote.update(table, data.clone(), filter.clone()).await
        }
        MutationKind::Upsert { data, on_conflict } => {
            remote
                .upsert(table, vec![data.clone()], on_conflict.as_deref())
                .await
        }
        MutationKind::Delete { filter } => remote.delete(table, filter.clone()).await,
    }
}

/// Convert a `json!({...})` literal into a row; non-objects become empty rows.
pub fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Condition on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    Gte(String, Value),
    /// Column absent or `null`
    IsNull(String),
}

impl Condition {
    pub(crate) fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq(column, value) => row.get(column) == Some(value),
            Self::In(column, values) => row
                .get(column)
                .is_some_and(|current| values.contains(current)),
            Self::Gte(column, value) => row.get(column).is_some_and(|current| {
                matches!(
                    compare_values(current, value),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }),
            Self::IsNull(column) => matches!(row.get(column), None | Some(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Read query: conditions, ordering and an optional page window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In(
            column.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn gte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Gte(column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull(column.into()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Page window starting at `offset`.
    #[must_use]
    pub const fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|condition| condition.matches(row))
    }
}

/// Order numbers numerically, strings lexically, booleans false-first.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_conditions_match_rows() {
        let row = into_row(json!({
            "user_id": "u1",
            "checkin_date": "2026-03-04",
            "value": 3,
        }));

        assert!(Query::new().eq("user_id", "u1").matches(&row));
        assert!(!Query::new().eq("user_id", "u2").matches(&row));
        assert!(Query::new().is_in("value", [1, 3]).matches(&row));
        assert!(Query::new().gte("checkin_date", "2026-03-01").matches(&row));
        assert!(!Query::new().gte("checkin_date", "2026-03-05").matches(&row));
        assert!(!Query::new().eq("missing", "x").matches(&row));
    }

    #[test]
    fn is_null_matches_missing_and_null_columns() {
        let archived = into_row(json!({ "id": "a", "archived_at": "2026-01-01" }));
        let cleared = into_row(json!({ "id": "b", "archived_at": null }));
        let never = into_row(json!({ "id": "c" }));

        let live = Query::new().is_null("archived_at");
        assert!(!live.matches(&archived));
        assert!(live.matches(&cleared));
        assert!(live.matches(&never));
    }

    #[test]
    fn transient_classification_follows_status() {
        assert!(RemoteError::Network("down".to_string()).is_transient());
        assert!(RemoteError::Api {
            status: Some(502),
            body: Value::Null
        }
        .is_transient());
        assert!(!RemoteError::Api {
            status: Some(401),
            body: Value::Null
        }
        .is_transient());
    }

    #[test]
    fn into_row_discards_non_objects() {
        assert!(into_row(json!([1, 2])).is_empty());
        assert_eq!(into_row(json!({ "a": 1 })).len(), 1);
    }
}
