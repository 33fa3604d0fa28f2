//! Probe run data model
//!
//! Wire shapes for a submission ([`TargetDefinition`]) and its report
//! ([`RunResult`]). Field names follow the JSON contract exposed by the API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use super::error::DispatchError;
use crate::utils::HasId;

/// Per-request timeout applied when a submission does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status of a run or of a single probe outcome
///
/// Only `Pass` and `Fail` are produced by the dispatcher. The remaining
/// variants are part of the wire vocabulary and reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Pass,
    Fail,
    Error,
    Unspecified,
}

impl Status {
    /// `Pass` when the observed status code is the expected one
    pub fn from_match(expected: u16, actual: u16) -> Self {
        if expected == actual {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Status::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Status::Fail)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => write!(f, "PENDING"),
            Status::Pass => write!(f, "PASS"),
            Status::Fail => write!(f, "FAIL"),
            Status::Error => write!(f, "ERROR"),
            Status::Unspecified => write!(f, "UNSPECIFIED"),
        }
    }
}

/// HTTP verbs a probe may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub const SUPPORTED: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }

    /// The equivalent verb for the HTTP client
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::SUPPORTED
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                DispatchError::Validation(format!(
                    "unsupported method '{s}' (expected one of GET, POST, PUT, DELETE, PATCH)"
                ))
            })
    }
}

impl TryFrom<String> for Method {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

/// One endpoint to verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub path: String,
    pub method: Method,
    pub expected_status: u16,
}

impl EndpointSpec {
    pub fn new(path: impl Into<String>, method: Method, expected_status: u16) -> Self {
        Self {
            path: path.into(),
            method,
            expected_status,
        }
    }

    /// Shorthand for a `GET` probe
    pub fn get(path: impl Into<String>, expected_status: u16) -> Self {
        Self::new(path, Method::Get, expected_status)
    }
}

impl HasId for EndpointSpec {
    fn id(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Input of one probe run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDefinition {
    pub base_url: String,
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
}

impl TargetDefinition {
    pub fn new(base_url: impl Into<String>, endpoints: Vec<EndpointSpec>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoints,
            max_timeout_seconds: None,
        }
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.max_timeout_seconds = Some(seconds);
        self
    }

    /// Check everything needed to issue the requests and return the parsed base URL
    pub fn validate(&self) -> Result<Url, DispatchError> {
        if self.base_url.trim().is_empty() {
            return Err(DispatchError::Validation("base_url must not be empty".into()));
        }

        let base_url = Url::parse(&self.base_url).map_err(|e| {
            DispatchError::Validation(format!("invalid base_url '{}': {e}", self.base_url))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(DispatchError::Validation(format!(
                "base_url '{}' cannot carry a path",
                self.base_url
            )));
        }

        if self.endpoints.is_empty() {
            return Err(DispatchError::Validation(
                "endpoints must contain at least one entry".into(),
            ));
        }

        if self.max_timeout_seconds == Some(0) {
            return Err(DispatchError::Validation(
                "max_timeout_seconds must be a positive integer".into(),
            ));
        }

        Ok(base_url)
    }

    /// Per-request timeout for this run
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.max_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

/// Join a probe path onto the base URL
///
/// Exactly one `/` separates the base path from the probe path. An empty
/// probe path addresses the base URL itself.
pub fn join_url(base: &Url, path: &str) -> Url {
    let suffix = path.trim_start_matches('/');
    if suffix.is_empty() {
        return base.clone();
    }

    let mut url = base.clone();
    let joined = format!("{}/{}", base.path().trim_end_matches('/'), suffix);
    url.set_path(&joined);
    url
}

/// Measured result of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub path: String,
    pub expected_status: u16,
    pub actual_status: u16,
    pub status: Status,
}

impl ProbeOutcome {
    pub fn measured(spec: &EndpointSpec, actual_status: u16) -> Self {
        Self {
            path: spec.path.clone(),
            expected_status: spec.expected_status,
            actual_status,
            status: Status::from_match(spec.expected_status, actual_status),
        }
    }
}

/// Report of one complete run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub request_id: String,
    pub base_url: String,
    pub status: Status,
    pub results: Vec<ProbeOutcome>,
}

impl RunResult {
    /// Build a report, deriving the overall verdict from the outcomes
    pub fn new(
        request_id: impl Into<String>,
        base_url: impl Into<String>,
        results: Vec<ProbeOutcome>,
    ) -> Self {
        let status = if results.iter().any(|r| r.status.is_fail()) {
            Status::Fail
        } else {
            Status::Pass
        };

        Self {
            request_id: request_id.into(),
            base_url: base_url.into(),
            status,
            results,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_pass()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_fail()).count()
    }
}
