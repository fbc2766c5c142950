//! Periodic pruning of old check log rows.
//!
//! Cleanup runs hourly as a background task; only the check log is pruned,
//! status rows are kept for as long as the site is configured.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::database::StatusStore;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Retention policy for check log rows.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Days to keep check log rows
    pub check_log_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { check_log_days: 30 }
    }
}

impl RetentionPolicy {
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.check_log_days)
    }
}

/// Cleanup manager for expired check log rows.
pub struct RetentionCleanup {
    store: Arc<dyn StatusStore>,
    policy: RetentionPolicy,
}

impl RetentionCleanup {
    pub fn new(store: Arc<dyn StatusStore>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// Delete check log rows older than the retention horizon.
    pub async fn prune_expired(&self) -> Result<u64> {
        let cutoff = self.policy.cutoff(Utc::now());
        let deleted = self.store.prune_checks(cutoff).await?;
        if deleted > 0 {
            info!(
                "Pruned {} check log entries older than {} days",
                deleted, self.policy.check_log_days
            );
        }
        Ok(deleted)
    }

    /// Start the hourly background cleanup task.
    pub fn start_periodic_cleanup(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                ticker.tick().await;
                match self.prune_expired().await {
                    Ok(deleted) => {
                        debug!("Periodic check log cleanup completed: {} deleted", deleted);
                    }
                    Err(e) => {
                        warn!("Periodic check log cleanup failed: {e:#}");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::monitoring::testutil::{MemoryStore, ok_result};

    #[test]
    fn default_policy_keeps_thirty_days() {
        assert_eq!(RetentionPolicy::default().check_log_days, 30);
    }

    #[test]
    fn cutoff_is_days_before_now() {
        let policy = RetentionPolicy { check_log_days: 7 };
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap();
        assert_eq!(policy.cutoff(now), now - chrono::Duration::days(7));
    }

    #[tokio::test]
    async fn prune_expired_reports_deleted_count() {
        let store = Arc::new(MemoryStore::default());
        {
            let mut old = ok_result("test-site");
            old.timestamp = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
            let mut checks = store.checks.lock().unwrap();
            checks.push(old);
            checks.push(ok_result("test-site"));
        }

        let cleanup = RetentionCleanup::new(store.clone(), RetentionPolicy::default());
        let deleted = cleanup.prune_expired().await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.check_count(), 1);
    }

    #[tokio::test]
    async fn periodic_cleanup_task_starts() {
        let store = Arc::new(MemoryStore::default());
        let cleanup = RetentionCleanup::new(store, RetentionPolicy::default());

        let handle = cleanup.start_periodic_cleanup();
        assert!(!handle.is_finished());
        handle.abort();
    }
}
