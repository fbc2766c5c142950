use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::types::CheckResult;
use crate::config::SiteConfig;

/// Probe port: performs one reachability check for a site.
///
/// A total operation: transport errors become `is_up = false` results,
/// never `Err`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, site: &SiteConfig) -> CheckResult;
}

/// HTTP prober backed by a shared client with the global timeout.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, site: &SiteConfig) -> CheckResult {
        let result = CheckResult::new(&site.name, &site.url);
        let start = Instant::now();

        match self.client.get(&site.url).send().await {
            Ok(response) => {
                let elapsed_ms = round2(start.elapsed().as_secs_f64() * 1000.0);
                let status = response.status().as_u16();
                if status == site.expected_status {
                    result.success(status, elapsed_ms)
                } else {
                    result.rejected(status, elapsed_ms, site.expected_status)
                }
            }
            Err(e) => {
                warn!("Check failed for {}: {e}", site.name);
                result.failure(e.to_string())
            }
        }
    }
}

fn round2(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
