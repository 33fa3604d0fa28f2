//! Result storage
//!
//! The service persists every successful run for the user that submitted it.
//! Writes are best-effort: callers spawn them after the response is prepared
//! and only log failures.
//!
//! Backends implement [`ResultStore`] and are injected into the API state.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{ProbeOutcome, RunResult, Status};

pub use memory::{DEFAULT_HISTORY_LIMIT, InMemoryStore};

/// Errors that can occur in a result store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Summary counts stored alongside a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub endpoint_count: usize,
    pub passed_count: usize,
    pub failed_count: usize,
}

/// A run as stored for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: String,
    pub user_id: String,
    pub request_id: String,
    pub base_url: String,
    pub status: Status,
    pub results: Vec<ProbeOutcome>,
    pub created_at: DateTime<Utc>,
    pub metadata: ResultMetadata,
}

impl StoredResult {
    /// Snapshot a run for `user_id`
    pub fn from_run(user_id: impl Into<String>, run: &RunResult) -> Self {
        Self {
            id: run.request_id.clone(),
            user_id: user_id.into(),
            request_id: run.request_id.clone(),
            base_url: run.base_url.clone(),
            status: run.status,
            results: run.results.clone(),
            created_at: Utc::now(),
            metadata: ResultMetadata {
                endpoint_count: run.results.len(),
                passed_count: run.passed_count(),
                failed_count: run.failed_count(),
            },
        }
    }
}

/// Storage backend for run results
///
/// Results are always scoped to a user: a user can never read another user's
/// runs.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Short backend name for logging
    fn name(&self) -> &'static str;

    /// Persist a run for `user_id`
    async fn store_result(&self, user_id: &str, run: &RunResult) -> Result<(), StoreError>;

    /// Fetch one run by its request id
    async fn get_result(
        &self,
        user_id: &str,
        request_id: &str,
    ) -> Result<Option<StoredResult>, StoreError>;

    /// Most recent runs first, at most `limit` of them
    async fn list_results(&self, user_id: &str, limit: usize)
    -> Result<Vec<StoredResult>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::EndpointSpec;

    #[test]
    fn test_stored_result_metadata() {
        let ok = EndpointSpec::get("/index", 200);
        let run = RunResult::new(
            "vigil-v0-1",
            "http://localhost",
            vec![
                ProbeOutcome::measured(&ok, 200),
                ProbeOutcome::measured(&ok, 500),
                ProbeOutcome::measured(&ok, 200),
            ],
        );

        let stored = StoredResult::from_run("user-1", &run);
        assert_eq!(stored.id, "vigil-v0-1");
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.status, Status::Fail);
        assert_eq!(
            stored.metadata,
            ResultMetadata {
                endpoint_count: 3,
                passed_count: 2,
                failed_count: 1,
            }
        );
    }
}
