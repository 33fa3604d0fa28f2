//! Handler error type
//!
//! Every handler failure renders as `{"message": ..., "service_version": ...}`
//! with a status code chosen by the error kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::execution::DispatchError;
use crate::store::StoreError;

/// Version reported in error bodies and service info
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON body of every handler error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub service_version: String,
}

/// Errors returned from API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for handler return values
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dispatch(DispatchError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(DispatchError::Cancelled { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = ErrorBody {
            message: self.to_string(),
            service_version: SERVICE_VERSION.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
