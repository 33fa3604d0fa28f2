//! Response bodies of the HTTP API
//!
//! Shared with [`crate::client`], which decodes the same shapes.

use serde::{Deserialize, Serialize};

use crate::store::StoredResult;

/// Body of `GET /` and `GET /home`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Body of `GET /healthz`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// RFC 2822 timestamp of the check
    pub timestamp: String,
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `GET /service-info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub authors: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    pub environment: String,
    pub uptime_seconds: u64,
    pub license: String,
    pub languages: Vec<String>,
}

/// Body of `GET /v0/tests/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub results: Vec<StoredResult>,
    pub count: usize,
}

impl From<Vec<StoredResult>> for HistoryResponse {
    fn from(results: Vec<StoredResult>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

/// Body of the fallback handler for unknown routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundBody {
    pub status_code: u16,
    pub message: String,
}
