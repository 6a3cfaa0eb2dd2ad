//! Client configuration.
//!
//! `ClientConfig` carries the public Supabase endpoint and anon key, the path
//! of the local queue database and the retry/probe tuning. Secret credentials
//! never live here; sessions are kept by the identity collaborator.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_SUPABASE_URL: &str = "VIBE_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "VIBE_SUPABASE_ANON_KEY";
pub const ENV_QUEUE_DB: &str = "VIBE_QUEUE_DB";

const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_db_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval_secs: Option<u64>,
}

impl ClientConfig {
    /// Parse and normalize a JSON config payload.
    pub fn parse(payload: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| format!("invalid config JSON: {error}"))?;
        config.normalized()
    }

    /// Override fields from environment-style variables.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_SUPABASE_URL)) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)) {
            self.supabase_anon_key = Some(key);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_QUEUE_DB)) {
            self.queue_db_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Trim values, drop empties and validate the Supabase URL.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key);
        self.supabase_url = match normalize_text_option(self.supabase_url) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err("config field 'supabase_url' must include http:// or https://".into())
            }
            None => None,
        };
        if self.probe_interval_secs == Some(0) {
            return Err("config field 'probe_interval_secs' must be positive".into());
        }
        Ok(self)
    }

    /// Both Supabase values, or an error naming what is missing.
    pub fn supabase(&self) -> Result<(&str, &str), String> {
        match (self.supabase_url.as_deref(), self.supabase_anon_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            (None, _) => Err(format!(
                "Supabase URL is not configured (set supabase_url or {ENV_SUPABASE_URL})"
            )),
            (_, None) => Err(format!(
                "Supabase anon key is not configured (set supabase_anon_key or {ENV_SUPABASE_ANON_KEY})"
            )),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy::new(
            self.retry_max_retries.unwrap_or(defaults.max_retries),
            self.retry_base_delay_ms
                .map_or(defaults.base_delay, Duration::from_millis),
        )
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(
            self.probe_interval_secs
                .unwrap_or(DEFAULT_PROBE_INTERVAL_SECS),
        )
    }
}
