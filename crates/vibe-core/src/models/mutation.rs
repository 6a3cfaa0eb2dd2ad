//! Deferred write operations

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::remote::{Filter, Row};
use crate::util::unix_timestamp_millis;

/// Queue entry identifier: enqueue time in milliseconds plus a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(String);

impl MutationId {
    #[must_use]
    pub fn new() -> Self {
        Self::at(unix_timestamp_millis())
    }

    fn at(millis: i64) -> Self {
        // The tail of a v7 UUID is random
        let random = Uuid::now_v7().simple().to_string();
        let suffix = &random[random.len() - 6..];
        Self(format!("{millis}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four remote write shapes, each carrying exactly the payload it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum MutationKind {
    Insert {
        data: Row,
    },
    Update {
        data: Row,
        #[serde(rename = "match")]
        filter: Filter,
    },
    Upsert {
        data: Row,
        #[serde(
            rename = "onConflict",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        on_conflict: Option<String>,
    },
    Delete {
        #[serde(rename = "match")]
        filter: Filter,
    },
}

impl MutationKind {
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Upsert { .. } => "upsert",
            Self::Delete { .. } => "delete",
        }
    }
}

/// A validated write against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    table: String,
    kind: MutationKind,
}

impl Mutation {
    pub fn insert(table: impl Into<String>, data: Row) -> Result<Self> {
        require_data(&data)?;
        Self::build(table, MutationKind::Insert { data })
    }

    pub fn update(table: impl Into<String>, data: Row, filter: Filter) -> Result<Self> {
        require_data(&data)?;
        require_filter(&filter)?;
        Self::build(table, MutationKind::Update { data, filter })
    }

    /// Upsert keyed by the comma-separated `on_conflict` columns.
    pub fn upsert(table: impl Into<String>, data: Row, on_conflict: Option<&str>) -> Result<Self> {
        require_data(&data)?;
        let on_conflict = on_conflict
            .map(str::trim)
            .filter(|columns| !columns.is_empty())
            .map(str::to_string);
        Self::build(table, MutationKind::Upsert { data, on_conflict })
    }

    pub fn delete(table: impl Into<String>, filter: Filter) -> Result<Self> {
        require_filter(&filter)?;
        Self::build(table, MutationKind::Delete { filter })
    }

    fn build(table: impl Into<String>, kind: MutationKind) -> Result<Self> {
        let table = table.into().trim().to_string();
        if table.is_empty() {
            return Err(Error::InvalidInput("Mutation table is required".into()));
        }
        Ok(Self { table, kind })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub const fn kind(&self) -> &MutationKind {
        &self.kind
    }

    pub fn into_parts(self) -> (String, MutationKind) {
        (self.table, self.kind)
    }
}

fn require_data(data: &Row) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidInput("Mutation data is required".into()));
    }
    Ok(())
}

fn require_filter(filter: &Filter) -> Result<()> {
    if filter.is_empty() {
        return Err(Error::InvalidInput(
            "Mutation match conditions are required".into(),
        ));
    }
    Ok(())
}

/// A durable record of one deferred write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    pub id: MutationId,
    pub table: String,
    #[serde(flatten)]
    pub kind: MutationKind,
    /// Enqueue time (Unix ms); informational only
    pub timestamp: i64,
}

impl QueuedMutation {
    pub fn new(mutation: Mutation) -> Self {
        let timestamp = unix_timestamp_millis();
        let (table, kind) = mutation.into_parts();
        Self {
            id: MutationId::at(timestamp),
            table,
            kind,
            timestamp,
        }
    }

    pub const fn operation(&self) -> &'static str {
        self.kind.operation()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::remote::into_row;

    #[test]
    fn ids_are_unique_under_rapid_generation() {
        let ids: HashSet<_> = (0..500).map(|_| MutationId::new()).collect();
        assert_eq!(ids.len(), 500);

        let id = MutationId::new();
        let (millis, suffix) = id.as_str().split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 6);
    }

    #[test]
    fn constructors_enforce_payload_shape() {
        let data = into_row(json!({ "note": "x" }));
        let filter = into_row(json!({ "id": "1" }));

        assert!(Mutation::insert("notes", Row::new()).is_err());
        assert!(Mutation::update("notes", data.clone(), Filter::new()).is_err());
        assert!(Mutation::delete("notes", Filter::new()).is_err());
        assert!(Mutation::upsert(" ", data.clone(), None).is_err());

        assert!(Mutation::update("notes", data, filter.clone()).is_ok());
        assert!(Mutation::delete("notes", filter).is_ok());
    }

    #[test]
    fn queued_mutation_uses_flat_wire_shape() {
        let mutation = Mutation::delete("saved_items", into_row(json!({ "item_id": "a" }))).unwrap();
        let entry = QueuedMutation::new(mutation);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["operation"], json!("delete"));
        assert_eq!(value["table"], json!("saved_items"));
        assert_eq!(value["match"], json!({ "item_id": "a" }));
        assert!(value.get("data").is_none());

        let decoded: QueuedMutation = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn upsert_keeps_conflict_columns() {
        let mutation = Mutation::upsert(
            "daily_checkins",
            into_row(json!({ "user_id": "u", "checkin_date": "2026-03-04" })),
            Some("user_id,checkin_date"),
        )
        .unwrap();

        let value = serde_json::to_value(QueuedMutation::new(mutation)).unwrap();
        assert_eq!(value["operation"], json!("upsert"));
        assert_eq!(value["onConflict"], json!("user_id,checkin_date"));
    }

    #[test]
    fn decodes_entries_written_without_conflict_columns() {
        let entry: QueuedMutation = serde_json::from_value(json!({
            "id": "1700000000000-abc123",
            "table": "daily_checkins",
            "operation": "upsert",
            "data": { "user_id": "u" },
            "timestamp": 1_700_000_000_000_i64,
        }))
        .unwrap();

        assert_eq!(
            entry.kind,
            MutationKind::Upsert {
                data: into_row(json!({ "user_id": "u" })),
                on_conflict: None,
            }
        );
    }
}
