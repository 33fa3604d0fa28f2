//! Concurrent task runner utilities
//!
//! Fan-out/fan-in over a list of items with:
//! - One spawned task per item, joined at a single barrier
//! - Results returned in input order, independent of completion order
//! - Optional concurrency limiting
//! - Cooperative cancellation through a [`CancellationToken`]
//!
//! ## Built on standard primitives
//!
//! - `tokio::spawn` for per-item tasks
//! - `tokio::sync::Semaphore` for concurrency limiting
//! - `tokio_util::sync::CancellationToken` for cancellation, with a drop guard
//!   so that dropping the runner's future stops every task it spawned
//!
//! Every task owns exactly one output slot, so no lock is needed to collect
//! results or failures.
//!
//! ## Example
//!
//! ```ignore
//! use vigil::utils::concurrent::{run_indexed, ConcurrentOpts};
//!
//! let slots = run_indexed(
//!     endpoints,
//!     |endpoint| async move { probe(endpoint).await },
//!     ConcurrentOpts::default().with_max_concurrency(8),
//!     CancellationToken::new(),
//! ).await;
//! ```

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors from concurrent task execution
#[derive(Debug, Error)]
pub enum ConcurrentError<E: std::fmt::Display> {
    /// The task ran and returned an error
    #[error("Task '{id}' failed: {error}")]
    TaskFailed { id: String, error: E },

    /// The task was cancelled before it finished
    #[error("Task '{id}' cancelled")]
    Cancelled { id: String },

    /// The spawned task panicked
    #[error("Task '{id}' panicked: {message}")]
    Panic { id: String, message: String },
}

/// Options for concurrent execution
#[derive(Debug, Clone, Default)]
pub struct ConcurrentOpts {
    /// Maximum concurrent tasks (None = one task per item, all at once)
    pub max_concurrency: Option<usize>,
}

impl ConcurrentOpts {
    /// Set maximum concurrency
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }

    /// Set maximum concurrency from an optional limit
    pub fn with_max_concurrency_opt(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max.map(|m| m.max(1));
        self
    }
}

/// Trait for items that can identify themselves for logging
pub trait HasId {
    fn id(&self) -> String;
}

impl HasId for String {
    fn id(&self) -> String {
        self.clone()
    }
}

impl HasId for &str {
    fn id(&self) -> String {
        self.to_string()
    }
}

impl<T: HasId> HasId for Arc<T> {
    fn id(&self) -> String {
        (**self).id()
    }
}

/// Run one task per item concurrently and return every result in input order
///
/// Slot `i` of the returned vector always belongs to item `i`. The call
/// returns only after every task has finished, been cancelled, or panicked.
///
/// Cancelling `cancel` stops tasks that are still waiting for a permit or
/// still running; their slots hold [`ConcurrentError::Cancelled`].
pub async fn run_indexed<I, T, E, F, Fut>(
    items: Vec<I>,
    task_fn: F,
    opts: ConcurrentOpts,
    cancel: CancellationToken,
) -> Vec<Result<T, ConcurrentError<E>>>
where
    I: HasId + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    if items.is_empty() {
        return Vec::new();
    }

    // Child token: cancelled by the caller's token, or by this guard when the
    // runner's future is dropped before the barrier is reached.
    let run_token = cancel.child_token();
    let _guard = run_token.clone().drop_guard();

    let semaphore = opts
        .max_concurrency
        .map(|max| Arc::new(Semaphore::new(max)));

    let ids: Vec<String> = items.iter().map(HasId::id).collect();
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let task_fn = task_fn.clone();
        let token = run_token.clone();
        let semaphore = semaphore.clone();
        let id = item.id();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(ConcurrentError::Cancelled { id });
                    }
                    permit = semaphore.acquire_owned() => permit.ok(),
                },
                None => None,
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(task_id = %id, "Task cancelled");
                    Err(ConcurrentError::Cancelled { id })
                }
                result = task_fn(item) => {
                    result.map_err(|error| ConcurrentError::TaskFailed { id, error })
                }
            }
        }));
    }

    // Barrier: awaiting in input order puts each result in its own slot
    let mut results = Vec::with_capacity(handles.len());
    for (handle, id) in handles.into_iter().zip(ids) {
        let slot = match handle.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => Err(ConcurrentError::Cancelled { id }),
            Err(join_error) => {
                warn!(task_id = %id, error = %join_error, "Task panicked");
                Err(ConcurrentError::Panic {
                    id,
                    message: join_error.to_string(),
                })
            }
        };
        results.push(slot);
    }

    results
}
