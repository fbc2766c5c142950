use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use super::checker::Prober;
use super::recorder::ResultRecorder;
use super::state::{self, RuntimeState, Transition};
use super::types::CheckResult;
use crate::config::{Config, SiteConfig};
use crate::database::StatusStore;
use crate::notify::Notifier;

/// Fixed scheduling quantum. Per-site check intervals are measured against
/// the wall clock, not counted in ticks.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Tick-driven monitoring scheduler.
///
/// Owns the per-site runtime state. Each tick probes every due site
/// concurrently, then processes the results one site at a time: state
/// machine, persistence, alert, reschedule.
pub struct Monitor {
    sites: Vec<SiteConfig>,
    default_interval_seconds: u64,
    confirm_down_after: u32,
    store: Arc<dyn StatusStore>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    recorder: ResultRecorder,
    runtime: HashMap<String, RuntimeState>,
}

impl Monitor {
    pub fn new(
        config: &Config,
        store: Arc<dyn StatusStore>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let now = Utc::now();
        let runtime = config
            .sites
            .iter()
            .map(|site| (site.name.clone(), RuntimeState::new(now)))
            .collect();

        Self {
            sites: config.sites.clone(),
            default_interval_seconds: config.global.check_interval_seconds,
            confirm_down_after: config.global.confirm_down_after,
            recorder: ResultRecorder::new(Arc::clone(&store)),
            store,
            prober,
            notifier,
            runtime,
        }
    }

    /// Run the scheduling loop until the stop flag is set.
    ///
    /// The flag is observed once per tick boundary; a tick in progress
    /// finishes all of its probes and writes first.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) {
        info!("Monitoring {} sites", self.sites.len());

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.tick().await;
        }

        info!("Shutdown complete");
    }

    /// One scheduling pass: probe every due site concurrently, then handle
    /// each result sequentially.
    pub(crate) async fn tick(&mut self) {
        let now = Utc::now();
        let due: Vec<SiteConfig> = self
            .sites
            .iter()
            .filter(|site| {
                self.runtime.get(&site.name).is_none_or(|state| state.next_run <= now)
            })
            .cloned()
            .collect();

        if due.is_empty() {
            return;
        }

        let probes: Vec<(SiteConfig, JoinHandle<CheckResult>)> = due
            .into_iter()
            .map(|site| {
                let prober = Arc::clone(&self.prober);
                let target = site.clone();
                let handle = tokio::spawn(async move { prober.probe(&target).await });
                (site, handle)
            })
            .collect();

        for (site, handle) in probes {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    // next_run stays due, so the site is retried next tick.
                    error!("Unexpected error checking {}: {e}", site.name);
                    continue;
                }
            };

            if let Err(e) = self.process_result(&site, &result).await {
                error!("Failed to process check for {}: {e:#}", site.name);
                continue;
            }

            self.reschedule(&site);
        }
    }

    /// Feed one probe result through the state machine, persist it, and
    /// dispatch the alert for a confirmed transition.
    async fn process_result(&mut self, site: &SiteConfig, result: &CheckResult) -> Result<()> {
        let previous = self.store.get_status(&site.name).await?;

        let runtime = self
            .runtime
            .entry(site.name.clone())
            .or_insert_with(|| RuntimeState::new(result.timestamp));

        let (failures, assessment) = state::evaluate(
            previous.as_ref(),
            result,
            runtime.consecutive_failures,
            self.confirm_down_after,
        );
        runtime.consecutive_failures = failures;

        match assessment.transition {
            Some(Transition::Down) => warn!("DOWN: {} is unreachable", site.name),
            Some(Transition::Recovered) => info!("RECOVERED: {} is back up", site.name),
            None if assessment.initial => {
                let observed = if result.is_up { "UP" } else { "DOWN" };
                info!("Initial check for {}: {}", site.name, observed);
            }
            None => {}
        }

        // Persist before alerting; a slow or failed delivery must not cost
        // the check log row or the status write.
        self.recorder.record(result, previous.as_ref(), &assessment).await?;

        match assessment.transition {
            Some(Transition::Down) => {
                if let Err(e) = self.notifier.notify_down(site, result, previous.as_ref()).await {
                    warn!("Failed to deliver down alert for {}: {e:#}", site.name);
                }
            }
            Some(Transition::Recovered) => {
                if let Err(e) = self.notifier.notify_recovery(site, result, previous.as_ref()).await
                {
                    warn!("Failed to deliver recovery alert for {}: {e:#}", site.name);
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Compute the next due time from the wall clock after processing, so a
    /// slow probe delays rather than double-fires the next check.
    fn reschedule(&mut self, site: &SiteConfig) {
        let interval_seconds =
            site.check_interval_seconds.unwrap_or(self.default_interval_seconds);
        if let Some(state) = self.runtime.get_mut(&site.name) {
            state.next_run = Utc::now() + chrono::Duration::seconds(interval_seconds as i64);
        }
    }
}
