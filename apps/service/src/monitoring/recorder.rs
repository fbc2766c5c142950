use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use super::state::Assessment;
use super::types::CheckResult;
use crate::database::StatusStore;
use crate::database::models::SiteStatus;

/// Persistence coordinator: keeps the check log complete and the status row
/// consistent with confirmed transitions only.
pub struct ResultRecorder {
    store: Arc<dyn StatusStore>,
}

impl ResultRecorder {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Persist one assessed check result.
    ///
    /// The check log append is best-effort; a failed status write is
    /// returned to the caller so that the site is not rescheduled past it.
    pub async fn record(
        &self,
        result: &CheckResult,
        previous: Option<&SiteStatus>,
        assessment: &Assessment,
    ) -> Result<()> {
        if let Err(e) = self.store.append_check(result).await {
            warn!("Failed to append check log for {}: {e:#}", result.site_name);
        }

        if assessment.write_status {
            let status = next_status(result, previous, assessment.state_changed);
            self.store.upsert_status(&status).await?;
        }

        Ok(())
    }
}

/// Compute the status row a result leads to.
///
/// `last_change_time` moves only on a confirmed transition and starts at
/// the first check's timestamp.
pub(crate) fn next_status(
    result: &CheckResult,
    previous: Option<&SiteStatus>,
    state_changed: bool,
) -> SiteStatus {
    let last_change_time = match previous {
        Some(p) if !state_changed => p.last_change_time,
        _ => result.timestamp,
    };

    SiteStatus {
        site_name: result.site_name.clone(),
        url: result.url.clone(),
        is_up: result.is_up,
        last_status_code: result.status_code,
        last_check_time: result.timestamp,
        last_change_time,
        error_message: result.error_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::state;
    use crate::monitoring::testutil::{MemoryStore, down_status, fail_result, ok_result, up_status};

    #[test]
    fn first_observation_sets_change_time_to_check_time() {
        let result = ok_result("site");
        let status = next_status(&result, None, false);
        assert_eq!(status.last_change_time, result.timestamp);
        assert_eq!(status.last_check_time, result.timestamp);
        assert!(status.is_up);
    }

    #[test]
    fn change_time_preserved_without_transition() {
        let previous = up_status("site");
        let result = ok_result("site");
        let status = next_status(&result, Some(&previous), false);
        assert_eq!(status.last_change_time, previous.last_change_time);
        assert_eq!(status.last_check_time, result.timestamp);
    }

    #[test]
    fn change_time_moves_on_transition() {
        let previous = down_status("site");
        let result = ok_result("site");
        let status = next_status(&result, Some(&previous), true);
        assert_eq!(status.last_change_time, result.timestamp);
        assert!(status.is_up);
    }

    #[tokio::test]
    async fn history_failure_does_not_block_status_write() {
        let store = Arc::new(MemoryStore { fail_append: true, ..Default::default() });
        let recorder = ResultRecorder::new(store.clone());

        let result = ok_result("site");
        let (_, assessment) = state::evaluate(None, &result, 0, 1);
        recorder.record(&result, None, &assessment).await.unwrap();

        assert!(store.status_of("site").is_some());
    }

    #[tokio::test]
    async fn status_write_failure_propagates() {
        let store = Arc::new(MemoryStore { fail_upsert: true, ..Default::default() });
        let recorder = ResultRecorder::new(store.clone());

        let result = ok_result("site");
        let (_, assessment) = state::evaluate(None, &result, 0, 1);
        assert!(recorder.record(&result, None, &assessment).await.is_err());
        assert_eq!(store.check_count(), 1);
    }

    #[tokio::test]
    async fn write_skip_leaves_status_untouched() {
        let store = Arc::new(MemoryStore::with_status(up_status("site")));
        let recorder = ResultRecorder::new(store.clone());

        let previous = up_status("site");
        let result = fail_result("site");
        let (_, assessment) = state::evaluate(Some(&previous), &result, 0, 3);
        recorder.record(&result, Some(&previous), &assessment).await.unwrap();

        let stored = store.status_of("site").unwrap();
        assert!(stored.is_up);
        // The check is still logged even though the status row is skipped.
        assert_eq!(store.check_count(), 1);
    }
}
