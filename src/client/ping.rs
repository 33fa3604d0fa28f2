//! Liveness pings
//!
//! Sends `HEAD` requests to a URL and reports how many came back live.

use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::vigil::ClientResult;

/// Pause between consecutive pings
pub const PING_INTERVAL: Duration = Duration::from_millis(500);

/// Settings for [`ping`]
#[derive(Debug, Clone)]
pub struct PingOptions {
    pub count: u32,
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self {
            count: 1,
            timeout: Duration::from_secs(5),
            interval: PING_INTERVAL,
        }
    }
}

/// One answered ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingAttempt {
    /// 1-based sequence number
    pub seq: u32,
    pub status: u16,
    pub latency: Duration,
}

impl PingAttempt {
    /// 2xx and 3xx count as live
    pub fn is_live(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Outcome of a ping series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingSummary {
    pub url: String,
    pub attempts: Vec<PingAttempt>,
}

impl PingSummary {
    pub fn count(&self) -> usize {
        self.attempts.len()
    }

    pub fn successful(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_live()).count()
    }

    pub fn average_latency(&self) -> Duration {
        if self.attempts.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.attempts.iter().map(|a| a.latency).sum();
        total / self.attempts.len() as u32
    }
}

/// Ping `url` `options.count` times
///
/// A transport failure on any ping aborts the series with an error; a non-live
/// status is recorded and the series continues.
pub async fn ping(url: &str, options: &PingOptions) -> ClientResult<PingSummary> {
    let target = Url::parse(url)?;
    let client = Client::builder().timeout(options.timeout).build()?;
    let count = options.count.max(1);

    debug!(url = %target, count, "Checking URL for liveness");

    let mut attempts = Vec::with_capacity(count as usize);
    for seq in 1..=count {
        let start = Instant::now();
        let response = client.head(target.clone()).send().await?;
        let attempt = PingAttempt {
            seq,
            status: response.status().as_u16(),
            latency: start.elapsed(),
        };

        if attempt.is_live() {
            debug!(url = %target, seq, latency_ms = attempt.latency.as_millis(), "LIVE");
        } else {
            warn!(url = %target, seq, status = attempt.status, "DOWN");
        }
        attempts.push(attempt);

        if seq < count {
            tokio::time::sleep(options.interval).await;
        }
    }

    let summary = PingSummary {
        url: target.to_string(),
        attempts,
    };
    info!(
        url = %summary.url,
        successful = summary.successful(),
        count = summary.count(),
        average_ms = summary.average_latency().as_millis(),
        "Ping complete"
    );

    Ok(summary)
}
