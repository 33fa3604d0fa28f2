//! HTTP API
//!
//! ## Endpoints
//!
//! - `POST /v0/tests/run` - Dispatch a target definition and return the report
//! - `GET /v0/tests/results?id=<request_id>` - One stored run
//! - `GET /v0/tests/history?limit=<n>` - Most recent stored runs
//! - `GET /healthz` - Liveness
//! - `GET /service-info` - Build and environment information
//! - `GET /metrics` - Prometheus metrics
//!
//! The `/v0` routes require a bearer token when a JWT secret is configured.

mod auth;
mod error;
mod metrics;
mod server;
mod state;
mod types;

pub use auth::{ANONYMOUS_USER, AuthUser};
pub use error::{ApiError, ApiResult, ErrorBody, SERVICE_VERSION};
pub use server::{DEFAULT_PAGE_LIMIT, create_router, serve, start_api_server};
pub use state::{ApiState, StatsSnapshot};
pub use types::{HealthStatus, HistoryResponse, NotFoundBody, ServiceInfo, WelcomeResponse};
