//! HTTP server
//!
//! Axum router for the probe API and the system routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth::AuthUser;
use super::error::{ApiError, ApiResult, SERVICE_VERSION};
use super::metrics::metrics_handler;
use super::state::ApiState;
use super::types::{HealthStatus, HistoryResponse, NotFoundBody, ServiceInfo, WelcomeResponse};
use crate::execution::{RunResult, TargetDefinition};
use crate::store::StoredResult;

/// Runs returned by `/v0/tests/history` when no limit is given
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Bind `addr` and serve until `shutdown` is cancelled
///
/// `addr` may name a host, e.g. `("localhost", 8080)`.
pub async fn start_api_server(
    addr: impl ToSocketAddrs,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Starting API server");
    serve(listener, state, shutdown).await
}

/// Serve on an already bound listener until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("API server stopped");
    Ok(())
}

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let v0 = Router::new()
        .route("/tests/run", post(run_handler))
        .route("/tests/results", get(results_handler))
        .route("/tests/history", get(history_handler));

    Router::new()
        .route("/", get(home_handler))
        .route("/home", get(home_handler))
        .route("/healthz", get(health_handler))
        .route("/service-info", get(service_info_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/v0", v0)
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Dispatch a submitted target and return its report
///
/// The report is stored for the caller in the background; a failed write is
/// logged and does not affect the response.
async fn run_handler(
    State(state): State<ApiState>,
    user: AuthUser,
    payload: Result<Json<TargetDefinition>, JsonRejection>,
) -> ApiResult<Json<RunResult>> {
    let Json(target) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let probes = target.endpoints.len();

    info!(
        user_id = %user.user_id,
        email = user.email.as_deref().unwrap_or("-"),
        base_url = %target.base_url,
        endpoints = probes,
        "Running tests"
    );

    let result = match state
        .dispatcher()
        .dispatch_with_cancel(target, state.shutdown_token().child_token())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            if !e.is_validation() {
                state.record_error(probes);
            }
            return Err(e.into());
        }
    };

    state.record_run(&result);

    let store = state.store();
    let user_id = user.user_id;
    let stored = result.clone();
    tokio::spawn(async move {
        if let Err(e) = store.store_result(&user_id, &stored).await {
            warn!(
                store = store.name(),
                request_id = %stored.request_id,
                error = %e,
                "Failed to store test result"
            );
        }
    });

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    #[serde(default)]
    id: String,
}

/// Fetch one of the caller's stored runs
async fn results_handler(
    State(state): State<ApiState>,
    user: AuthUser,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<StoredResult>> {
    if query.id.is_empty() {
        return Err(ApiError::BadRequest("Empty ID parameter".into()));
    }

    state
        .store()
        .get_result(&user.user_id, &query.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No result found for ID {}", query.id)))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<String>,
}

/// List the caller's most recent runs, newest first
async fn history_handler(
    State(state): State<ApiState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = match query.limit.as_deref() {
        None | Some("") => DEFAULT_PAGE_LIMIT,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::BadRequest("Invalid limit parameter".into()))?,
    };

    let results = state.store().list_results(&user.user_id, limit).await?;
    Ok(Json(HistoryResponse::from(results)))
}

async fn home_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Vigil API!".to_string(),
    })
}

async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        timestamp: chrono::Utc::now().to_rfc2822(),
        status: "healthy".to_string(),
    })
}

async fn service_info_handler(State(state): State<ApiState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: SERVICE_VERSION.to_string(),
        authors: env!("CARGO_PKG_AUTHORS").to_string(),
        repository: env!("CARGO_PKG_REPOSITORY").to_string(),
        environment: state.environment().to_string(),
        uptime_seconds: state.uptime().as_secs(),
        license: env!("CARGO_PKG_LICENSE").to_string(),
        languages: vec!["Rust".to_string()],
    })
}

async fn not_found_handler(uri: Uri) -> (StatusCode, Json<NotFoundBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            status_code: StatusCode::NOT_FOUND.as_u16(),
            message: format!("Endpoint '{}' does not exist", uri.path()),
        }),
    )
}
