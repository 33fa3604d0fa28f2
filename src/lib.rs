//! Vigil - API Monitoring Service
//!
//! Probes a list of HTTP endpoints on a target service concurrently and
//! reports whether each one answered with the expected status code.
//!
//! ## Architecture
//!
//! - A submission names a base URL and the endpoints to probe
//! - Every endpoint is probed once, all at the same time
//! - A run either produces a full report with a PASS/FAIL verdict, or fails as
//!   a whole when any probe could not complete its exchange
//! - Reports are stored per user and exposed over an HTTP API
//!
//! ## Modules
//!
//! - [`execution`] - Probe dispatcher and data model
//! - [`api`] - HTTP API (axum)
//! - [`auth`] - Bearer-token authentication
//! - [`store`] - Result storage
//! - [`client`] - Client for a remote service, and liveness pings
//! - [`config`] - Service configuration
//! - [`utils`] - Concurrent execution helpers

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod execution;
pub mod store;
pub mod utils;
