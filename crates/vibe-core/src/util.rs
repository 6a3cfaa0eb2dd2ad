//! Shared utility functions used across multiple modules.

use chrono::{Days, NaiveDate, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current UTC time as an RFC 3339 string, the shape the backend returns.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today_date() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// UTC date `days` before today as `YYYY-MM-DD`.
pub fn days_ago(days: u64) -> String {
    let today = Utc::now().date_naive();
    today
        .checked_sub_days(Days::new(days))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

/// Validate a caller-supplied `YYYY-MM-DD` date.
pub fn is_valid_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Round to two decimal places.
pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
