//! Call records.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable outcome of one outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Target URL (already scrubbed of sensitive fields).
    pub url: String,
    /// Uppercased HTTP verb.
    pub method: String,
    /// Response status, or 0 when no response was received.
    pub status_code: u16,
    /// Wall time from dispatch to settle, in milliseconds.
    pub duration_ms: u64,
    /// True iff a response arrived with status in [200, 400).
    pub success: bool,
    /// Failure description. Present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallRecord {
    /// Build a record for a call that produced a response.
    ///
    /// Responses outside [200, 400) are failures and carry
    /// `"HTTP <status> <status text>"` as their error.
    pub fn from_response(
        url: impl Into<String>,
        method: &str,
        status_code: u16,
        status_text: &str,
        duration: Duration,
    ) -> Self {
        let success = (200..400).contains(&status_code);
        let error = if success {
            None
        } else {
            Some(format!("HTTP {} {}", status_code, status_text).trim_end().to_string())
        };

        Self {
            url: url.into(),
            method: method.to_ascii_uppercase(),
            status_code,
            duration_ms: duration_millis(duration),
            success,
            error,
        }
    }

    /// Build a record for a call that failed.
    ///
    /// `status_code` is the status carried by the error, if any.
    pub fn from_error(
        url: impl Into<String>,
        method: &str,
        status_code: Option<u16>,
        message: &str,
        duration: Duration,
    ) -> Self {
        let message = message.trim();
        let error = if message.is_empty() {
            "Unknown error".to_string()
        } else {
            message.to_string()
        };

        Self {
            url: url.into(),
            method: method.to_ascii_uppercase(),
            status_code: status_code.unwrap_or(0),
            duration_ms: duration_millis(duration),
            success: false,
            error: Some(error),
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
