//! Contacts and the daily "did we connect" log.

use serde_json::{json, Value};

use super::{CONTACTS, CONTACT_LOGS};
use crate::auth::SessionProvider;
use crate::client::{decode_all, single, to_row, VibeClient, WriteOutcome};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{Contact, ContactInput, ContactUpdate, DailyContactLog, Mutation, RecordId};
use crate::remote::{into_row, Query, RemoteStore};
use crate::storage::KeyValueStore;
use crate::util::{is_valid_date, normalize_text_option, now_rfc3339, today_date};

const CONTACT_LOG_CONFLICT: &str = "user_id,contact_id,log_date";

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    /// Contacts in display order.
    pub async fn contacts(&self) -> Result<Vec<Contact>> {
        let user = self.require_user().await?;
        decode_all(
            self.select(
                CONTACTS,
                Query::new()
                    .eq("user_id", user.id)
                    .order("sort_order", true),
            )
            .await?,
        )
    }

    /// New contacts go to the end of the list unless a position is given.
    pub async fn add_contact(&self, input: ContactInput) -> Result<Contact> {
        let user = self.require_user().await?;
        let mut input = input.normalized()?;
        self.require_online().await?;

        if input.sort_order.is_none() {
            let existing = self
                .select(CONTACTS, Query::new().eq("user_id", user.id.as_str()))
                .await?;
            input.sort_order = Some(i64::try_from(existing.len()).unwrap_or(i64::MAX));
        }

        let mut payload = to_row(&input)?;
        payload.insert("user_id".into(), Value::String(user.id));
        let rows = self.execute(&Mutation::insert(CONTACTS, payload)?).await?;
        single(rows, CONTACTS)
    }

    pub async fn update_contact(&self, contact_id: &str, update: ContactUpdate) -> Result<Contact> {
        let user = self.require_user().await?;
        let update = update.normalized()?;
        self.require_online().await?;

        let mut data = to_row(&update)?;
        data.insert("updated_at".into(), Value::String(now_rfc3339()));
        let filter = into_row(json!({ "id": contact_id, "user_id": user.id }));
        let rows = self
            .execute(&Mutation::update(CONTACTS, data, filter)?)
            .await?;
        single(rows, CONTACTS)
    }

    pub async fn delete_contact(&self, contact_id: &str) -> Result<()> {
        let user = self.require_user().await?;
        self.require_online().await?;

        let filter = into_row(json!({ "id": contact_id, "user_id": user.id }));
        self.execute(&Mutation::delete(CONTACTS, filter)?).await?;
        tracing::debug!(contact_id, "Deleted contact");
        Ok(())
    }

    /// Persist the order of `contact_ids` as their `sort_order`.
    pub async fn reorder_contacts(&self, contact_ids: &[String]) -> Result<()> {
        let user = self.require_user().await?;
        self.require_online().await?;

        for (index, contact_id) in contact_ids.iter().enumerate() {
            let data = into_row(json!({ "sort_order": index }));
            let filter = into_row(json!({ "id": contact_id, "user_id": user.id }));
            self.execute(&Mutation::update(CONTACTS, data, filter)?)
                .await?;
        }
        Ok(())
    }

    /// Mark a contact as connected with on `log_date` (today when `None`).
    ///
    /// Keyed by user, contact and day, so it is queued while offline.
    pub async fn log_daily_contact(
        &self,
        contact_id: &str,
        note: Option<String>,
        log_date: Option<&str>,
    ) -> Result<DailyContactLog> {
        let user = self.require_user().await?;
        let log_date = resolve_date(log_date)?;
        let contact_id = contact_id.trim();
        if contact_id.is_empty() {
            return Err(Error::InvalidInput("Contact id is required".into()));
        }
        let note = normalize_text_option(note);

        let payload = to_row(&json!({
            "user_id": user.id,
            "contact_id": contact_id,
            "log_date": log_date,
            "connected": true,
            "note": note,
        }))?;
        let mutation = Mutation::upsert(CONTACT_LOGS, payload, Some(CONTACT_LOG_CONFLICT))?;

        match self.write_or_defer(mutation).await? {
            WriteOutcome::Persisted(rows) => single(rows, CONTACT_LOGS),
            WriteOutcome::Deferred(_) => Ok(DailyContactLog {
                id: RecordId::Pending,
                user_id: user.id,
                contact_id: contact_id.to_string(),
                log_date,
                connected: true,
                note,
                created_at: now_rfc3339(),
            }),
        }
    }

    pub async fn daily_logs(&self, log_date: Option<&str>) -> Result<Vec<DailyContactLog>> {
        let user = self.require_user().await?;
        let log_date = resolve_date(log_date)?;
        decode_all(
            self.select(
                CONTACT_LOGS,
                Query::new()
                    .eq("user_id", user.id)
                    .eq("log_date", log_date),
            )
            .await?,
        )
    }

    /// Most recent first.
    pub async fn contact_log_history(
        &self,
        contact_id: &str,
        limit: usize,
    ) -> Result<Vec<DailyContactLog>> {
        let user = self.require_user().await?;
        decode_all(
            self.select(
                CONTACT_LOGS,
                Query::new()
                    .eq("user_id", user.id)
                    .eq("contact_id", contact_id)
                    .order("log_date", false)
                    .limit(limit),
            )
            .await?,
        )
    }
}

fn resolve_date(value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        None | Some("") => Ok(today_date()),
        Some(date) if is_valid_date(date) => Ok(date.to_string()),
        Some(date) => Err(Error::InvalidInput(format!(
            "Log date must be YYYY-MM-DD, got '{date}'"
        ))),
    }
}
