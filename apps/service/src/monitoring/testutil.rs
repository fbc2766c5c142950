//! Shared test doubles for the monitoring engine.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::checker::Prober;
use super::types::CheckResult;
use crate::config::{AlertConfig, Config, GlobalConfig, SiteConfig};
use crate::database::StatusStore;
use crate::database::models::{CheckRecord, SiteStatus};
use crate::notify::Notifier;

/// In-memory store with scriptable failures.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub statuses: Mutex<HashMap<String, SiteStatus>>,
    pub checks: Mutex<Vec<CheckResult>>,
    pub fail_append: bool,
    pub fail_upsert: bool,
}

impl MemoryStore {
    pub fn with_status(status: SiteStatus) -> Self {
        let store = Self::default();
        store.statuses.lock().unwrap().insert(status.site_name.clone(), status);
        store
    }

    pub fn status_of(&self, site_name: &str) -> Option<SiteStatus> {
        self.statuses.lock().unwrap().get(site_name).cloned()
    }

    pub fn check_count(&self) -> usize {
        self.checks.lock().unwrap().len()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn get_status(&self, site_name: &str) -> Result<Option<SiteStatus>> {
        Ok(self.statuses.lock().unwrap().get(site_name).cloned())
    }

    async fn upsert_status(&self, status: &SiteStatus) -> Result<()> {
        if self.fail_upsert {
            return Err(anyhow!("upsert failed"));
        }
        self.statuses.lock().unwrap().insert(status.site_name.clone(), status.clone());
        Ok(())
    }

    async fn append_check(&self, result: &CheckResult) -> Result<i64> {
        if self.fail_append {
            return Err(anyhow!("append failed"));
        }
        let mut checks = self.checks.lock().unwrap();
        checks.push(result.clone());
        Ok(checks.len() as i64)
    }

    async fn recent_checks(&self, site_name: &str, limit: usize) -> Result<Vec<CheckRecord>> {
        let checks = self.checks.lock().unwrap();
        Ok(checks
            .iter()
            .rev()
            .filter(|c| c.site_name == site_name)
            .take(limit)
            .map(|c| CheckRecord {
                id: None,
                site_name: c.site_name.clone(),
                timestamp: c.timestamp,
                status_code: c.status_code,
                response_time_ms: c.response_time_ms,
                is_up: c.is_up,
                error_message: c.error_message.clone(),
            })
            .collect())
    }

    async fn prune_checks(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut checks = self.checks.lock().unwrap();
        let before = checks.len();
        checks.retain(|c| c.timestamp >= cutoff);
        Ok((before - checks.len()) as u64)
    }
}

/// What a scripted probe should do next.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ScriptedOutcome {
    Up,
    Down,
    Panic,
}

/// Prober that produces a fixed outcome until told otherwise.
pub(crate) struct ScriptedProber {
    outcome: Mutex<ScriptedOutcome>,
}

impl ScriptedProber {
    pub fn new(outcome: ScriptedOutcome) -> Self {
        Self { outcome: Mutex::new(outcome) }
    }

    pub fn set(&self, outcome: ScriptedOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, site: &SiteConfig) -> CheckResult {
        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            ScriptedOutcome::Up => CheckResult::new(&site.name, &site.url).success(200, 5.0),
            ScriptedOutcome::Down => {
                CheckResult::new(&site.name, &site.url).rejected(503, 5.0, site.expected_status)
            }
            ScriptedOutcome::Panic => panic!("scripted probe panic"),
        }
    }
}

/// Notifier that records which alerts were requested.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub down: Mutex<Vec<String>>,
    pub recovered: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn down_count(&self) -> usize {
        self.down.lock().unwrap().len()
    }

    pub fn recovery_count(&self) -> usize {
        self.recovered.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_down(
        &self,
        site: &SiteConfig,
        _result: &CheckResult,
        _previous: Option<&SiteStatus>,
    ) -> Result<()> {
        self.down.lock().unwrap().push(site.name.clone());
        Ok(())
    }

    async fn notify_recovery(
        &self,
        site: &SiteConfig,
        _result: &CheckResult,
        _previous: Option<&SiteStatus>,
    ) -> Result<()> {
        self.recovered.lock().unwrap().push(site.name.clone());
        Ok(())
    }
}

pub(crate) fn test_site(name: &str) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        url: "https://example.com".to_string(),
        check_interval_seconds: None,
        expected_status: 200,
    }
}

pub(crate) fn test_config(sites: Vec<SiteConfig>, confirm_down_after: u32) -> Config {
    Config {
        global: GlobalConfig { confirm_down_after, ..GlobalConfig::default() },
        alerts: AlertConfig { webhook_url: "https://hooks.example.com/test".to_string() },
        sites,
    }
}

pub(crate) fn ok_result(site_name: &str) -> CheckResult {
    CheckResult::new(site_name, "https://example.com").success(200, 12.5)
}

pub(crate) fn fail_result(site_name: &str) -> CheckResult {
    CheckResult::new(site_name, "https://example.com").rejected(503, 20.0, 200)
}

pub(crate) fn up_status(site_name: &str) -> SiteStatus {
    SiteStatus {
        site_name: site_name.to_string(),
        url: "https://example.com".to_string(),
        is_up: true,
        last_status_code: Some(200),
        last_check_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        last_change_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        error_message: None,
    }
}

pub(crate) fn down_status(site_name: &str) -> SiteStatus {
    SiteStatus {
        is_up: false,
        last_status_code: Some(503),
        error_message: Some("Expected 200, got 503".to_string()),
        ..up_status(site_name)
    }
}
