//! Test execution engine
//!
//! Probes a list of endpoints on a target concurrently and reduces the
//! outcomes to a single verdict.
//!
//! - [`types`] - submission and report data model
//! - [`Dispatcher`] - fan-out/fan-in over the endpoints
//! - [`DispatchError`] - validation, transport and cancellation errors

mod dispatcher;
mod error;
mod types;

pub use dispatcher::{Dispatcher, REQUEST_ID_PREFIX, new_request_id};
pub use error::{DispatchError, ProbeFailure, error_chain};
pub use types::*;
