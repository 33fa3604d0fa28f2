//! Vigil Test Kit
//!
//! Test infrastructure for probing real HTTP servers without leaving the
//! machine.
//!
//! This crate provides:
//! - [`MockTarget`] - a loopback HTTP server with scripted status codes and delays
//! - [`unreachable_url`] - a URL whose connections are refused

pub mod mock;

pub use mock::{MockRoute, MockTarget, RecordedRequest, RunningTarget, unreachable_url};
