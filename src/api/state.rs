//! API State management
//!
//! Shared state for the HTTP API: the injected collaborators plus run
//! counters for the metrics endpoint.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::auth::JwtConfig;
use crate::execution::{Dispatcher, RunResult};
use crate::store::{InMemoryStore, ResultStore};

/// Run counters
#[derive(Debug, Default)]
struct RunStats {
    runs_total: u64,
    runs_passed: u64,
    runs_failed: u64,
    runs_errored: u64,
    probes_total: u64,
    last_run_at: Option<DateTime<Utc>>,
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub runs_total: u64,
    pub runs_passed: u64,
    pub runs_failed: u64,
    pub runs_errored: u64,
    pub probes_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Shared API state
///
/// Cheap to clone; every clone refers to the same collaborators and counters.
#[derive(Clone)]
pub struct ApiState {
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn ResultStore>,
    jwt: Option<Arc<JwtConfig>>,
    environment: Arc<str>,
    shutdown: CancellationToken,
    started_at: Instant,
    stats: Arc<RwLock<RunStats>>,
}

impl ApiState {
    /// Create state from explicitly constructed collaborators
    pub fn new(dispatcher: Dispatcher, store: Arc<dyn ResultStore>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            store,
            jwt: None,
            environment: Arc::from("local"),
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
            stats: Arc::new(RwLock::new(RunStats::default())),
        }
    }

    /// State with a default dispatcher, an in-memory store and no auth
    pub fn in_memory() -> Self {
        Self::new(Dispatcher::new(), Arc::new(InMemoryStore::default()))
    }

    /// Require bearer tokens signed with this configuration
    pub fn with_jwt(mut self, jwt: Option<JwtConfig>) -> Self {
        self.jwt = jwt.map(Arc::new);
        self
    }

    pub fn with_environment(mut self, environment: &str) -> Self {
        self.environment = Arc::from(environment);
        self
    }

    /// Token cancelled when the server shuts down; in-flight runs observe it
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> Arc<dyn ResultStore> {
        Arc::clone(&self.store)
    }

    pub fn jwt(&self) -> Option<&JwtConfig> {
        self.jwt.as_deref()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record a completed run
    pub fn record_run(&self, result: &RunResult) {
        let mut stats = self.stats.write();
        stats.runs_total += 1;
        if result.status.is_fail() {
            stats.runs_failed += 1;
        } else {
            stats.runs_passed += 1;
        }
        stats.probes_total += result.results.len() as u64;
        stats.last_run_at = Some(Utc::now());
    }

    /// Record a run that produced no report
    pub fn record_error(&self, probes: usize) {
        let mut stats = self.stats.write();
        stats.runs_total += 1;
        stats.runs_errored += 1;
        stats.probes_total += probes as u64;
        stats.last_run_at = Some(Utc::now());
    }

    pub fn stats(&self) -> StatsSnapshot {
        let stats = self.stats.read();
        StatsSnapshot {
            runs_total: stats.runs_total,
            runs_passed: stats.runs_passed,
            runs_failed: stats.runs_failed,
            runs_errored: stats.runs_errored,
            probes_total: stats.probes_total,
            last_run_at: stats.last_run_at,
        }
    }
}
