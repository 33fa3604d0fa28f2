//! Bearer-token extractor

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::error::ApiError;
use super::state::ApiState;
use crate::auth::validate_token;

/// User id used for every request when authentication is disabled
pub const ANONYMOUS_USER: &str = "anonymous";

/// Authenticated caller, taken from `Authorization: Bearer <token>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl AuthUser {
    fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER.to_string(),
            email: None,
        }
    }
}

impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Some(jwt) = state.jwt() else {
            return Ok(AuthUser::anonymous());
        };

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authorization header required".into()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized(
                "Invalid authorization header format. Expected 'Bearer <token>'".into(),
            )
        })?;

        let claims = validate_token(token, jwt).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
