use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a single reachability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Configured name of the checked site
    pub site_name: String,

    /// URL that was checked
    pub url: String,

    /// Whether the check counted as a success
    pub is_up: bool,

    /// HTTP status code, when an exchange completed
    pub status_code: Option<u16>,

    /// Response time in milliseconds, when an exchange completed
    pub response_time_ms: Option<f64>,

    /// Why the check failed; always set when `is_up` is false
    pub error_message: Option<String>,

    /// When the check was performed
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    /// Create a new check result, stamped with the current time.
    pub fn new(site_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            url: url.into(),
            is_up: false,
            status_code: None,
            response_time_ms: None,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Mark the check as successful.
    pub fn success(mut self, status_code: u16, response_time_ms: f64) -> Self {
        self.is_up = true;
        self.status_code = Some(status_code);
        self.response_time_ms = Some(response_time_ms);
        self
    }

    /// Mark the check as failed with a completed exchange that returned the
    /// wrong status.
    pub fn rejected(mut self, status_code: u16, response_time_ms: f64, expected_status: u16) -> Self {
        self.is_up = false;
        self.status_code = Some(status_code);
        self.response_time_ms = Some(response_time_ms);
        self.error_message = Some(format!("Expected {expected_status}, got {status_code}"));
        self
    }

    /// Mark the check as failed without a completed exchange.
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.is_up = false;
        self.error_message = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_populates_exchange_fields() {
        let result = CheckResult::new("site", "https://example.com").success(200, 12.5);
        assert!(result.is_up);
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.response_time_ms, Some(12.5));
        assert!(result.error_message.is_none());
    }

    #[test]
    fn rejected_keeps_exchange_details() {
        let result = CheckResult::new("site", "https://example.com").rejected(503, 8.0, 200);
        assert!(!result.is_up);
        assert_eq!(result.status_code, Some(503));
        assert_eq!(result.response_time_ms, Some(8.0));
        assert_eq!(result.error_message.as_deref(), Some("Expected 200, got 503"));
    }

    #[test]
    fn failure_carries_only_the_error() {
        let result = CheckResult::new("site", "https://example.com").failure("connection refused");
        assert!(!result.is_up);
        assert!(result.status_code.is_none());
        assert!(result.response_time_ms.is_none());
        assert_eq!(result.error_message.as_deref(), Some("connection refused"));
    }
}
