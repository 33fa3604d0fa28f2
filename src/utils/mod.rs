//! Utility modules for vigil
//!
//! Common utilities used by the dispatcher and the service.

pub mod concurrent;

pub use concurrent::{ConcurrentError, ConcurrentOpts, HasId, run_indexed};
