//! Mock HTTP targets
//!
//! A [`MockTarget`] is a real HTTP server on a loopback port that answers
//! each path with a configured status code, optionally after a delay. It
//! records every request it sees so tests can assert on what was probed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vigil_testkit::MockTarget;
//!
//! # async fn example() -> std::io::Result<()> {
//! let target = MockTarget::new()
//!     .route("/healthz", 200)
//!     .route_with_delay("/slow", 200, Duration::from_millis(200))
//!     .start()
//!     .await?;
//!
//! let base_url = target.url();
//! // ... probe `base_url` ...
//! assert_eq!(target.hits("/healthz"), 1);
//! # Ok(())
//! # }
//! ```

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the target answers one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockRoute {
    pub status: u16,
    pub delay: Duration,
}

/// A request the target received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

/// Builder for a mock target
#[derive(Debug, Clone)]
pub struct MockTarget {
    routes: HashMap<String, MockRoute>,
    fallback_status: u16,
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTarget {
    /// Target with no routes; unknown paths answer 404
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback_status: 404,
        }
    }

    /// Answer `path` with `status` immediately
    pub fn route(self, path: impl Into<String>, status: u16) -> Self {
        self.route_with_delay(path, status, Duration::ZERO)
    }

    /// Answer `path` with `status` after `delay`
    pub fn route_with_delay(mut self, path: impl Into<String>, status: u16, delay: Duration) -> Self {
        self.routes.insert(path.into(), MockRoute { status, delay });
        self
    }

    /// Status for paths without a route
    pub fn with_fallback_status(mut self, status: u16) -> Self {
        self.fallback_status = status;
        self
    }

    /// Bind a loopback port and start serving
    pub async fn start(self) -> std::io::Result<RunningTarget> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(TargetState {
            routes: self.routes,
            fallback_status: self.fallback_status,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        });

        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(RunningTarget {
            addr,
            state,
            handle,
        })
    }
}

#[derive(Debug)]
struct TargetState {
    routes: HashMap<String, MockRoute>,
    fallback_status: u16,
    requests: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

async fn respond(State(state): State<Arc<TargetState>>, method: Method, uri: Uri) -> StatusCode {
    let path = uri.path().to_string();
    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
    });

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak_in_flight.fetch_max(now, Ordering::SeqCst);

    let route = state.routes.get(&path).copied().unwrap_or(MockRoute {
        status: state.fallback_status,
        delay: Duration::ZERO,
    });
    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }

    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// A started mock target; the server stops when this is dropped
#[derive(Debug)]
pub struct RunningTarget {
    addr: SocketAddr,
    state: Arc<TargetState>,
    handle: JoinHandle<()>,
}

impl RunningTarget {
    /// Base URL, e.g. `http://127.0.0.1:40123`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests received for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// All requests received, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn total_hits(&self) -> usize {
        self.state.requests.lock().len()
    }

    /// Largest number of requests that were being handled at once
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for RunningTarget {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A loopback URL with nothing listening on it
///
/// Connections to it are refused.
pub async fn unreachable_url() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_routes_and_fallback() {
        let target = MockTarget::new()
            .route("/ok", 200)
            .route("/gone", 410)
            .start()
            .await
            .unwrap();

        assert!(raw_get(target.addr(), "/ok").await.starts_with("HTTP/1.1 200"));
        assert!(raw_get(target.addr(), "/gone").await.starts_with("HTTP/1.1 410"));
        assert!(raw_get(target.addr(), "/other").await.starts_with("HTTP/1.1 404"));

        assert_eq!(target.hits("/ok"), 1);
        assert_eq!(target.total_hits(), 3);
        assert_eq!(target.requests()[0].method, "GET");
    }

    #[tokio::test]
    async fn test_unreachable_url_refuses() {
        let url = unreachable_url().await.unwrap();
        let addr: SocketAddr = url.trim_start_matches("http://").parse().unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
