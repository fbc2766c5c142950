//! Alert delivery for confirmed availability transitions.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::{AlertConfig, SiteConfig};
use crate::database::models::SiteStatus;
use crate::monitoring::types::CheckResult;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Alert port: best-effort delivery of transition notifications.
///
/// Failures are for the caller to log; nothing here retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_down(
        &self,
        site: &SiteConfig,
        result: &CheckResult,
        previous: Option<&SiteStatus>,
    ) -> Result<()>;

    async fn notify_recovery(
        &self,
        site: &SiteConfig,
        result: &CheckResult,
        previous: Option<&SiteStatus>,
    ) -> Result<()>;
}

/// Notifier that POSTs alert text to a JSON webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(config: &AlertConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build()?;
        Ok(Self { client, webhook_url: config.webhook_url.clone() })
    }

    async fn post(&self, message: String) -> Result<()> {
        let payload = serde_json::json!({ "content": message });
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_down(
        &self,
        site: &SiteConfig,
        result: &CheckResult,
        previous: Option<&SiteStatus>,
    ) -> Result<()> {
        self.post(build_down_message(site, result, previous)).await
    }

    async fn notify_recovery(
        &self,
        site: &SiteConfig,
        result: &CheckResult,
        previous: Option<&SiteStatus>,
    ) -> Result<()> {
        self.post(build_recovery_message(site, result, previous)).await
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn build_down_message(
    site: &SiteConfig,
    result: &CheckResult,
    previous: Option<&SiteStatus>,
) -> String {
    let mut message = format!(
        "[DOWN] {} is unreachable\nSite: {}\nURL: {}\nTime: {}\n",
        site.name,
        site.name,
        site.url,
        format_time(result.timestamp),
    );

    if let Some(status_code) = result.status_code {
        message.push_str(&format!(
            "HTTP Status: {} (expected {})\n",
            status_code, site.expected_status
        ));
    }

    if let Some(error) = &result.error_message {
        message.push_str(&format!("Error: {error}\n"));
    }

    if let Some(previous) = previous.filter(|p| p.is_up) {
        message.push_str(&format!(
            "\nThis site was previously UP since {}.",
            format_time(previous.last_change_time)
        ));
    }

    message
}

pub(crate) fn build_recovery_message(
    site: &SiteConfig,
    result: &CheckResult,
    previous: Option<&SiteStatus>,
) -> String {
    let mut message = format!(
        "[RECOVERED] {} is back up\nSite: {}\nURL: {}\nTime: {}\n",
        site.name,
        site.name,
        site.url,
        format_time(result.timestamp),
    );

    if let Some(previous) = previous.filter(|p| !p.is_up) {
        let minutes = (result.timestamp - previous.last_change_time).num_minutes();
        message.push_str(&format!(
            "Downtime duration: ~{minutes} minutes\n\nThis site was DOWN since {}.",
            format_time(previous.last_change_time)
        ));
    }

    message
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::monitoring::testutil::{down_status, fail_result, ok_result, test_site, up_status};

    #[test]
    fn down_message_includes_status_and_history() {
        let site = test_site("test-site");
        let result = fail_result("test-site");
        let previous = up_status("test-site");

        let message = build_down_message(&site, &result, Some(&previous));
        assert!(message.starts_with("[DOWN] test-site is unreachable"));
        assert!(message.contains("HTTP Status: 503 (expected 200)"));
        assert!(message.contains("Error: Expected 200, got 503"));
        assert!(message.contains("previously UP since"));
    }

    #[test]
    fn down_message_without_history_has_no_previous_line() {
        let site = test_site("test-site");
        let result = fail_result("test-site");

        let message = build_down_message(&site, &result, None);
        assert!(!message.contains("previously UP"));
    }

    #[test]
    fn down_message_without_exchange_skips_status_line() {
        let site = test_site("test-site");
        let result = CheckResult::new("test-site", "https://example.com")
            .failure("connection refused");

        let message = build_down_message(&site, &result, None);
        assert!(!message.contains("HTTP Status"));
        assert!(message.contains("Error: connection refused"));
    }

    #[test]
    fn recovery_message_reports_downtime_minutes() {
        let site = test_site("test-site");
        let mut previous = down_status("test-site");
        previous.last_change_time = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let mut result = ok_result("test-site");
        result.timestamp = Utc.with_ymd_and_hms(2026, 1, 1, 1, 30, 0).unwrap();

        let message = build_recovery_message(&site, &result, Some(&previous));
        assert!(message.starts_with("[RECOVERED] test-site is back up"));
        assert!(message.contains("Downtime duration: ~90 minutes"));
        assert!(message.contains("DOWN since"));
    }

    #[test]
    fn webhook_notifier_builds() {
        let config = AlertConfig { webhook_url: "https://hooks.example.com/x".to_string() };
        assert!(WebhookNotifier::new(&config).is_ok());
    }
}
