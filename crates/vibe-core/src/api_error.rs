//! Classification of remote-store failures into a single typed error.

use std::fmt;

use serde_json::Value;

use crate::error::Error;
use crate::remote::RemoteError;
use crate::util::compact_text;

const UNKNOWN_ERROR: &str = "Unknown error";
const NETWORK_CODE: &str = "network";

/// Typed remote error exposing a human-readable message and optional code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ERROR)
    }

    /// True when the request never reached the backend.
    pub fn is_network(&self) -> bool {
        self.code.as_deref() == Some(NETWORK_CODE)
    }

    /// Network failures, timeouts, throttling and server faults.
    pub fn is_transient(&self) -> bool {
        if self.is_network() {
            return true;
        }
        matches!(self.status, Some(408 | 429 | 500..=599))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(formatter, "{} [{}]", self.message, code),
            None => write!(formatter, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RemoteError> for ApiError {
    fn from(error: RemoteError) -> Self {
        classify(error)
    }
}

/// Translate any remote-store failure into the crate error.
///
/// Callers use it as the terminal step of a failed call:
/// `return Err(handle_remote_error(error))`.
pub fn handle_remote_error(error: RemoteError) -> Error {
    Error::Api(classify(error))
}

/// Normalize a remote-store failure into an [`ApiError`].
pub fn classify(error: RemoteError) -> ApiError {
    match error {
        RemoteError::Network(message) => {
            let message = compact_text(&message);
            let message = if message.is_empty() {
                "Network request failed".to_string()
            } else {
                message
            };
            ApiError::new(message).with_code(NETWORK_CODE)
        }
        RemoteError::Api { status, body } => {
            let mut classified = classify_body(&body);
            classified.status = status;
            classified
        }
    }
}

fn classify_body(body: &Value) -> ApiError {
    let Value::Object(fields) = body else {
        return ApiError::unknown();
    };

    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty());

    let Some(message) = message else {
        return ApiError::unknown();
    };

    let code = match fields.get("code") {
        Some(Value::String(code)) if !code.trim().is_empty() => Some(code.trim().to_string()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => None,
    };

    ApiError {
        message: message.to_string(),
        code,
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_postgrest_error_body() {
        let error = classify(RemoteError::Api {
            status: Some(409),
            body: json!({
                "message": "duplicate key value violates unique constraint",
                "code": "23505",
                "details": null,
            }),
        });
        assert_eq!(
            error,
            ApiError {
                message: "duplicate key value violates unique constraint".to_string(),
                code: Some("23505".to_string()),
                status: Some(409),
            }
        );
        assert!(!error.is_transient());
    }

    #[test]
    fn numeric_codes_are_stringified() {
        let error = classify(RemoteError::Api {
            status: None,
            body: json!({ "message": "boom", "code": 42 }),
        });
        assert_eq!(error.code.as_deref(), Some("42"));
    }

    #[test]
    fn malformed_shapes_map_to_unknown_error() {
        for body in [
            json!("plain string"),
            json!(null),
            json!([1, 2, 3]),
            json!({ "details": "no message here" }),
            json!({ "message": 17 }),
            json!({ "message": "   " }),
        ] {
            let error = classify(RemoteError::Api { status: None, body });
            assert_eq!(error.message, "Unknown error");
            assert_eq!(error.code, None);
        }
    }

    #[test]
    fn falls_back_to_auth_style_message_keys() {
        let error = classify(RemoteError::Api {
            status: Some(400),
            body: json!({ "error_description": "Invalid login credentials" }),
        });
        assert_eq!(error.message, "Invalid login credentials");
    }

    #[test]
    fn network_errors_are_transient() {
        let error = classify(RemoteError::Network("connection refused".to_string()));
        assert!(error.is_network());
        assert!(error.is_transient());
    }

    #[test]
    fn server_faults_are_transient() {
        let error = ApiError::new("upstream").with_status(503);
        assert!(error.is_transient());
        assert!(!ApiError::new("bad").with_status(400).is_transient());
    }

    #[test]
    fn handle_remote_error_wraps_as_api_variant() {
        let error = handle_remote_error(RemoteError::Network(String::new()));
        assert!(matches!(error, Error::Api(ref api) if api.message == "Network request failed"));
        assert_eq!(error.user_message(), "Network request failed");
    }
}
