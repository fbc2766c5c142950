use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current status of a monitored site, one durable row per site.
///
/// `last_change_time` moves only when the stored `is_up` flips to a new
/// confirmed state; same-state checks update `last_check_time` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStatus {
    pub site_name: String,
    pub url: String,
    pub is_up: bool,
    pub last_status_code: Option<u16>,
    pub last_check_time: DateTime<Utc>,
    pub last_change_time: DateTime<Utc>,
    pub error_message: Option<String>,
}

/// One row of the check log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: Option<i64>,
    pub site_name: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<f64>,
    pub is_up: bool,
    pub error_message: Option<String>,
}

/// Convert a UTC timestamp to unix seconds for storage.
pub(crate) fn to_unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

/// Convert stored unix seconds back to a UTC timestamp.
pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn unix_roundtrip_keeps_whole_seconds() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 12, 34, 56).unwrap();
        assert_eq!(from_unix(to_unix(ts)), ts);
    }
}
