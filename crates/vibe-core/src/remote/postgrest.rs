//! PostgREST (Supabase REST) implementation of the remote store.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{Condition, Filter, Query, RemoteError, RemoteResult, RemoteStore, Row};
use crate::auth::AccessTokenSource;
use crate::util::{compact_text, is_http_url};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Supabase REST client authenticated with the anon key and, while someone
/// is signed in, the access token `tokens` yields for each request.
pub struct PostgrestStore<T> {
    rest_url: String,
    anon_key: String,
    tokens: Arc<T>,
    client: Client,
}

impl<T: AccessTokenSource> PostgrestStore<T> {
    pub fn new(
        supabase_url: &str,
        anon_key: impl Into<String>,
        tokens: Arc<T>,
    ) -> Result<Self, String> {
        let rest_url = normalize_rest_url(supabase_url)?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err("Supabase anon key must not be empty".to_string());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| format!("failed to build REST client: {error}"))?;

        Ok(Self {
            rest_url,
            anon_key,
            tokens,
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, urlencoding::encode(table))
    }

    /// Current access token, or the anon key when signed out or the session
    /// cannot be read.
    async fn bearer_token(&self) -> String {
        match self.tokens.access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => self.anon_key.clone(),
            Err(error) => {
                tracing::warn!("Using anon key, access token unavailable: {}", error);
                self.anon_key.clone()
            }
        }
    }

    async fn dispatch(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let token = self.bearer_token().await;
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Vec<Row>> {
        let response = self.dispatch(request).await?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(RemoteError::Api {
                status: Some(status.as_u16()),
                body: parse_error_body(status, &body),
            });
        }

        parse_rows(&body)
    }
}

impl<T: AccessTokenSource> RemoteStore for PostgrestStore<T> {
    async fn insert(&self, table: &str, rows: Vec<Row>) -> RemoteResult<Vec<Row>> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send(request).await
    }

    async fn update(&self, table: &str, data: Row, filter: Filter) -> RemoteResult<Vec<Row>> {
        let request = self
            .client
            .patch(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&filter_params(&filter))
            .json(&data);
        self.send(request).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        on_conflict: Option<&str>,
    ) -> RemoteResult<Vec<Row>> {
        let mut request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=representation");
        if let Some(columns) = on_conflict {
            request = request.query(&[("on_conflict", columns)]);
        }
        self.send(request.json(&rows)).await
    }

    async fn delete(&self, table: &str, filter: Filter) -> RemoteResult<Vec<Row>> {
        let request = self
            .client
            .delete(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&filter_params(&filter));
        self.send(request).await
    }

    async fn select(&self, table: &str, query: Query) -> RemoteResult<Vec<Row>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&query_params(&query));
        self.send(request).await
    }

    async fn count(&self, table: &str, query: Query) -> RemoteResult<usize> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(condition_params(&query));
        let request = self
            .client
            .head(self.table_url(table))
            .header("Prefer", "count=exact")
            .query(&params);

        let response = self.dispatch(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: Some(status.as_u16()),
                body: parse_error_body(status, ""),
            });
        }

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| RemoteError::Api {
                status: Some(status.as_u16()),
                body: serde_json::json!({ "message": "response did not include a row count" }),
            })
    }
}

fn normalize_rest_url(url: &str) -> Result<String, String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("Supabase URL must not be empty".to_string());
    }
    if !is_http_url(trimmed) {
        return Err("Supabase URL must include http:// or https://".to_string());
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        RemoteError::Network(error.to_string())
    } else {
        RemoteError::Api {
            status: error.status().map(|status| status.as_u16()),
            body: Value::String(error.to_string()),
        }
    }
}

pub(crate) fn parse_error_body(status: StatusCode, body: &str) -> Value {
    serde_json::from_str::<Value>(body).unwrap_or_else(|_| {
        let trimmed = compact_text(body);
        if trimmed.is_empty() {
            serde_json::json!({ "message": format!("HTTP {}", status.as_u16()) })
        } else {
            serde_json::json!({ "message": trimmed })
        }
    })
}

fn parse_rows(body: &str) -> RemoteResult<Vec<Row>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value = serde_json::from_str::<Value>(body).map_err(|error| RemoteError::Api {
        status: None,
        body: serde_json::json!({ "message": format!("invalid response payload: {error}") }),
    })?;

    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        Value::Object(row) => vec![row],
        _ => Vec::new(),
    })
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn render_list_item(value: &Value) -> String {
    match value {
        Value::String(text) => format!("\"{}\"", text.replace('"', "\\\"")),
        other => render_value(other),
    }
}

fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    filter
        .iter()
        .map(|(column, value)| match value {
            Value::Null => (column.clone(), "is.null".to_string()),
            other => (column.clone(), format!("eq.{}", render_value(other))),
        })
        .collect()
}

fn condition_params(query: &Query) -> impl Iterator<Item = (String, String)> + '_ {
    query.conditions.iter().map(|condition| match condition {
        Condition::Eq(column, value) => (column.clone(), format!("eq.{}", render_value(value))),
        Condition::Gte(column, value) => (column.clone(), format!("gte.{}", render_value(value))),
        Condition::In(column, values) => {
            let items = values
                .iter()
                .map(render_list_item)
                .collect::<Vec<_>>()
                .join(",");
            (column.clone(), format!("in.({items})"))
        }
        Condition::IsNull(column) => (column.clone(), "is.null".to_string()),
    })
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn content_range_total(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(condition_params(query));

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }

    params
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::auth::{AuthError, AuthResult};
    use crate::remote::into_row;
    use crate::test_http::{response, CannedServer};

    /// Hands out a new token on every call, like a session refreshed between
    /// requests.
    #[derive(Default)]
    struct RotatingTokens {
        issued: Mutex<usize>,
    }

    impl AccessTokenSource for RotatingTokens {
        async fn access_token(&self) -> AuthResult<Option<String>> {
            let mut issued = self.issued.lock().unwrap();
            *issued += 1;
            Ok(Some(format!("token-{}", *issued)))
        }
    }

    struct SignedOut;

    impl AccessTokenSource for SignedOut {
        async fn access_token(&self) -> AuthResult<Option<String>> {
            Ok(None)
        }
    }

    struct BrokenKeychain;

    impl AccessTokenSource for BrokenKeychain {
        async fn access_token(&self) -> AuthResult<Option<String>> {
            Err(AuthError::SecureStorage("keychain locked".to_string()))
        }
    }

    fn store<T: AccessTokenSource>(url: &str, tokens: T) -> PostgrestStore<T> {
        PostgrestStore::new(url, "anon-key", Arc::new(tokens)).unwrap()
    }

    #[test]
    fn normalize_rest_url_appends_rest_path() {
        assert_eq!(
            normalize_rest_url("https://demo.supabase.co/").unwrap(),
            "https://demo.supabase.co/rest/v1"
        );
        assert_eq!(
            normalize_rest_url("https://demo.supabase.co/rest/v1").unwrap(),
            "https://demo.supabase.co/rest/v1"
        );
        assert!(normalize_rest_url("demo.supabase.co").is_err());
        assert!(normalize_rest_url("  ").is_err());
    }

    #[test]
    fn rejects_empty_anon_key() {
        assert!(PostgrestStore::new("https://demo.supabase.co", " ", Arc::new(SignedOut)).is_err());
    }

    #[tokio::test]
    async fn each_request_reads_the_current_access_token() {
        let store = store("https://demo.supabase.co", RotatingTokens::default());
        assert_eq!(store.bearer_token().await, "token-1");
        assert_eq!(store.bearer_token().await, "token-2");
    }

    #[tokio::test]
    async fn falls_back_to_anon_key_without_a_session() {
        assert_eq!(store("https://demo.supabase.co", SignedOut).bearer_token().await, "anon-key");
        assert_eq!(
            store("https://demo.supabase.co", BrokenKeychain)
                .bearer_token()
                .await,
            "anon-key"
        );
    }

    #[tokio::test]
    async fn requests_carry_the_refreshed_token() {
        let server = CannedServer::start(vec![
            response("200 OK", &[], "[]"),
            response("200 OK", &[], r#"[{"id":"a"}]"#),
        ])
        .await;
        let store = store(&server.url, RotatingTokens::default());

        store.select("daily_checkins", Query::new()).await.unwrap();
        let rows = store.select("daily_checkins", Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);

        let requests: Vec<String> = server
            .requests()
            .iter()
            .map(|request| request.to_ascii_lowercase())
            .collect();
        assert!(requests[0].contains("authorization: bearer token-1"));
        assert!(requests[1].contains("authorization: bearer token-2"));
        assert!(requests[1].contains("apikey: anon-key"));
    }

    #[tokio::test]
    async fn count_reads_exact_total_from_content_range() {
        let server = CannedServer::start(vec![response(
            "206 Partial Content",
            &[("content-range", "0-0/42")],
            "",
        )])
        .await;
        let store = store(&server.url, SignedOut);

        let total = store
            .count("daily_checkins", Query::new().eq("user_id", "u1").limit(5))
            .await
            .unwrap();
        assert_eq!(total, 42);

        let request = server.requests()[0].to_ascii_lowercase();
        assert!(request.starts_with("head /rest/v1/daily_checkins?"));
        assert!(request.contains("user_id=eq.u1"));
        assert!(!request.contains("limit="));
        assert!(request.contains("prefer: count=exact"));
    }

    #[test]
    fn content_range_total_handles_empty_and_partial_ranges() {
        assert_eq!(content_range_total("0-24/3573"), Some(3573));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn query_params_render_postgrest_operators() {
        let query = Query::new()
            .eq("user_id", "u1")
            .is_in("checkin_id", ["a", "b"])
            .gte("checkin_date", "2026-03-01")
            .is_null("archived_at")
            .order("checkin_date", false)
            .range(10, 5);

        assert_eq!(
            query_params(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.u1".to_string()),
                ("checkin_id".to_string(), "in.(\"a\",\"b\")".to_string()),
                ("checkin_date".to_string(), "gte.2026-03-01".to_string()),
                ("archived_at".to_string(), "is.null".to_string()),
                ("order".to_string(), "checkin_date.desc".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("offset".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn filter_params_render_equality_and_null() {
        let filter = into_row(json!({ "id": 7, "archived_at": null }));
        let mut params = filter_params(&filter);
        params.sort();
        assert_eq!(
            params,
            vec![
                ("archived_at".to_string(), "is.null".to_string()),
                ("id".to_string(), "eq.7".to_string()),
            ]
        );
    }

    #[test]
    fn parse_rows_accepts_arrays_objects_and_empty_bodies() {
        assert_eq!(parse_rows("").unwrap().len(), 0);
        assert_eq!(parse_rows(r#"[{"id":"a"},{"id":"b"}]"#).unwrap().len(), 2);
        assert_eq!(parse_rows(r#"{"id":"a"}"#).unwrap().len(), 1);
        assert!(parse_rows("not json").is_err());
    }

    #[test]
    fn error_bodies_fall_back_to_text_message() {
        let body = parse_error_body(StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert_eq!(body, json!({ "message": "upstream unavailable" }));

        let empty = parse_error_body(StatusCode::BAD_GATEWAY, "");
        assert_eq!(empty, json!({ "message": "HTTP 502" }));
    }
}
