//! Probe dispatcher
//!
//! Fans a [`TargetDefinition`] out into one HTTP probe per endpoint, joins
//! them, and reduces the outcomes into a [`RunResult`].
//!
//! ## Error policy
//!
//! - A status mismatch is a measured `FAIL` outcome and never aborts the run.
//! - A transport failure (the exchange could not complete) voids the whole
//!   run: the call returns [`DispatchError::Transport`] listing every failed
//!   endpoint, and no report.
//!
//! No retries are attempted; each endpoint gets exactly one request per run.

use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::error::{DispatchError, ProbeFailure};
use super::types::{
    DEFAULT_TIMEOUT, EndpointSpec, ProbeOutcome, RunResult, TargetDefinition, join_url,
};
use crate::utils::{ConcurrentError, ConcurrentOpts, HasId, run_indexed};

/// Prefix of every generated run identifier
pub const REQUEST_ID_PREFIX: &str = "vigil-v0-";

/// Generate an opaque identifier for a run
pub fn new_request_id() -> String {
    format!("{REQUEST_ID_PREFIX}{}", Uuid::new_v4())
}

/// Runs probe sets against targets
///
/// Holds only immutable settings; every call builds its own HTTP client and
/// shares nothing with other runs.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    default_timeout: Duration,
    max_concurrency: Option<usize>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            max_concurrency: None,
        }
    }

    /// Timeout used when a submission does not set `max_timeout_seconds`
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Cap the number of probes in flight per run
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max.map(|m| m.max(1));
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Probe every endpoint of `target` and report the outcomes
    pub async fn dispatch(&self, target: TargetDefinition) -> Result<RunResult, DispatchError> {
        self.dispatch_with_cancel(target, CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), aborting outstanding probes when
    /// `cancel` fires
    pub async fn dispatch_with_cancel(
        &self,
        target: TargetDefinition,
        cancel: CancellationToken,
    ) -> Result<RunResult, DispatchError> {
        let base_url = target.validate()?;
        let timeout = target.timeout_or(self.default_timeout);
        let request_id = new_request_id();
        let total = target.endpoints.len();
        let start = Instant::now();

        debug!(
            request_id = %request_id,
            base_url = %target.base_url,
            endpoints = total,
            timeout_ms = timeout.as_millis(),
            max_concurrency = ?self.max_concurrency,
            "Dispatching probes"
        );

        // One client per run: shared read-only by all probes, pooled internally
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DispatchError::Client)?;

        let probes: Vec<Probe> = target
            .endpoints
            .iter()
            .enumerate()
            .map(|(index, spec)| Probe::new(index, spec.clone(), &base_url))
            .collect();

        let slots = run_indexed(
            probes,
            move |probe: Probe| {
                let client = client.clone();
                async move { probe.execute(&client).await }
            },
            ConcurrentOpts::default().with_max_concurrency_opt(self.max_concurrency),
            cancel,
        )
        .await;

        let mut outcomes = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Ok(outcome) => outcomes.push(outcome),
                Err(ConcurrentError::TaskFailed { error, .. }) => failures.push(error),
                Err(ConcurrentError::Panic { message, .. }) => failures.push(ProbeFailure::new(
                    index,
                    &target.endpoints[index],
                    format!("probe task panicked: {message}"),
                )),
                Err(ConcurrentError::Cancelled { .. }) => {
                    warn!(request_id = %request_id, "Run cancelled");
                    return Err(DispatchError::Cancelled { request_id });
                }
            }
        }

        if !failures.is_empty() {
            for failure in &failures {
                warn!(
                    request_id = %request_id,
                    method = %failure.method,
                    path = %failure.path,
                    cause = %failure.cause,
                    "Probe could not complete"
                );
            }
            return Err(DispatchError::Transport {
                request_id,
                total,
                failures,
            });
        }

        let result = RunResult::new(request_id, target.base_url, outcomes);

        info!(
            request_id = %result.request_id,
            status = %result.status,
            passed = result.passed_count(),
            failed = result.failed_count(),
            duration_ms = start.elapsed().as_millis(),
            "Run complete"
        );

        Ok(result)
    }
}

/// A single endpoint bound to its absolute URL
struct Probe {
    index: usize,
    spec: EndpointSpec,
    url: Url,
}

impl Probe {
    fn new(index: usize, spec: EndpointSpec, base_url: &Url) -> Self {
        let url = join_url(base_url, &spec.path);
        Self { index, spec, url }
    }

    /// Issue the request and compare the status code
    ///
    /// The response body is never read; dropping the response releases it.
    async fn execute(self, client: &Client) -> Result<ProbeOutcome, ProbeFailure> {
        let response = client
            .request(self.spec.method.as_reqwest(), self.url.clone())
            .send()
            .await
            .map_err(|e| ProbeFailure::from_error(self.index, &self.spec, &e))?;

        let actual_status = response.status().as_u16();
        drop(response);

        let outcome = ProbeOutcome::measured(&self.spec, actual_status);
        debug!(
            url = %self.url,
            method = %self.spec.method,
            expected = self.spec.expected_status,
            actual = actual_status,
            status = %outcome.status,
            "Probe complete"
        );
        Ok(outcome)
    }
}

impl HasId for Probe {
    fn id(&self) -> String {
        self.spec.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::types::Status;

    #[test]
    fn test_request_id_format() {
        let a = new_request_id();
        let b = new_request_id();
        assert!(a.starts_with(REQUEST_ID_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn test_dispatcher_defaults() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.default_timeout(), Duration::from_secs(5));
        assert_eq!(dispatcher.max_concurrency(), None);

        let dispatcher = Dispatcher::new().with_max_concurrency(Some(0));
        assert_eq!(dispatcher.max_concurrency(), Some(1));
    }

    #[test]
    fn test_probe_url() {
        let base = Url::parse("http://127.0.0.1:9000/").unwrap();
        let probe = Probe::new(0, EndpointSpec::get("/healthz", 200), &base);
        assert_eq!(probe.url.as_str(), "http://127.0.0.1:9000/healthz");
        assert_eq!(probe.id(), "GET /healthz");
    }

    #[tokio::test]
    async fn test_validation_happens_before_dispatch() {
        let dispatcher = Dispatcher::new();
        let err = dispatcher
            .dispatch(TargetDefinition::new("http://127.0.0.1:1", vec![]))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let target = TargetDefinition::new(
            "http://10.255.255.1:81",
            vec![EndpointSpec::get("/slow", 200)],
        );
        let err = Dispatcher::new()
            .dispatch_with_cancel(target, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled { .. }));
    }

    #[test]
    fn test_status_reserved_variants_serialize() {
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"PENDING\"");
        assert_eq!(serde_json::to_string(&Status::Unspecified).unwrap(), "\"UNSPECIFIED\"");
    }
}
