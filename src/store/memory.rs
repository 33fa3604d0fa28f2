//! In-memory result store
//!
//! Keeps the most recent runs of each user in insertion order. Meant for
//! single-instance deployments and tests; everything is lost on restart.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{ResultStore, StoreError, StoredResult};
use crate::execution::RunResult;

/// Default number of runs retained per user
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Runs of one user, oldest first, keyed by request id
type UserHistory = IndexMap<String, StoredResult>;

/// Shared in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<HashMap<String, UserHistory>>>,
    history_limit: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl InMemoryStore {
    /// Create a store retaining at most `history_limit` runs per user
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            history_limit: history_limit.max(1),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Number of runs held for `user_id`
    pub fn len_for(&self, user_id: &str) -> usize {
        self.inner.read().get(user_id).map_or(0, IndexMap::len)
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn store_result(&self, user_id: &str, run: &RunResult) -> Result<(), StoreError> {
        let stored = StoredResult::from_run(user_id, run);

        let mut users = self.inner.write();
        let history = users.entry(user_id.to_string()).or_default();
        history.insert(stored.request_id.clone(), stored);

        while history.len() > self.history_limit {
            if let Some((evicted, _)) = history.shift_remove_index(0) {
                debug!(user = %user_id, request_id = %evicted, "Evicted oldest result");
            }
        }

        debug!(
            user = %user_id,
            request_id = %run.request_id,
            stored = history.len(),
            "Stored result"
        );
        Ok(())
    }

    async fn get_result(
        &self,
        user_id: &str,
        request_id: &str,
    ) -> Result<Option<StoredResult>, StoreError> {
        let users = self.inner.read();
        Ok(users
            .get(user_id)
            .and_then(|history| history.get(request_id))
            .cloned())
    }

    async fn list_results(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredResult>, StoreError> {
        let users = self.inner.read();
        Ok(users
            .get(user_id)
            .map(|history| history.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
