//! Remote clients
//!
//! [`VigilClient`] talks to a running Vigil service; [`ping`] checks any URL
//! for liveness.

mod ping;
mod vigil;

pub use ping::{PING_INTERVAL, PingAttempt, PingOptions, PingSummary, ping};
pub use vigil::{ClientError, ClientResult, VigilClient};
