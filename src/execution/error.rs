//! Dispatch error taxonomy
//!
//! A status-code mismatch is *not* an error: it is reported as a `FAIL`
//! outcome inside an otherwise successful run. Errors here mean the run
//! produced no usable report.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use super::types::{EndpointSpec, Method};

/// Errors returned by [`Dispatcher`](super::Dispatcher)
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The submission was rejected before any probe was issued
    #[error("invalid target definition: {0}")]
    Validation(String),

    /// At least one probe could not complete its HTTP exchange
    #[error(
        "failed to make {} of {total} requests: {}",
        .failures.len(),
        join_failures(.failures)
    )]
    Transport {
        request_id: String,
        total: usize,
        failures: Vec<ProbeFailure>,
    },

    /// The run was cancelled before every probe finished
    #[error("run {request_id} was cancelled")]
    Cancelled { request_id: String },

    /// The HTTP client for the run could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl DispatchError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DispatchError::Validation(_))
    }

    /// Failed probes, empty unless this is a transport error
    pub fn failures(&self) -> &[ProbeFailure] {
        match self {
            DispatchError::Transport { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// A probe that could not complete its HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    /// Position of the endpoint in the submitted list
    pub index: usize,
    pub method: Method,
    pub path: String,
    /// Underlying cause, including its source chain
    pub cause: String,
}

impl ProbeFailure {
    pub fn new(index: usize, spec: &EndpointSpec, cause: impl Into<String>) -> Self {
        Self {
            index,
            method: spec.method,
            path: spec.path.clone(),
            cause: cause.into(),
        }
    }

    /// Build a failure from an error, flattening its source chain
    pub fn from_error(index: usize, spec: &EndpointSpec, error: &(dyn StdError + 'static)) -> Self {
        Self::new(index, spec, error_chain(error))
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.method, self.path, self.cause)
    }
}

fn join_failures(failures: &[ProbeFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render an error and all of its sources as `outer: inner: root`
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // reqwest and hyper sometimes repeat the inner message in the outer one
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
