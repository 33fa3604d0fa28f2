//! Configuration parsing
//!
//! Handles parsing of the service configuration file.
//!
//! ## Configuration Format
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//!   environment: local
//!
//! auth:
//!   jwt_secret: change-me      # or VIGIL_JWT_SECRET
//!   token_expiry: 24h
//!
//! dispatch:
//!   default_timeout: 5s
//!   max_concurrency: 64
//!
//! storage:
//!   history_limit: 100
//! ```
//!
//! Every section and field is optional.

mod service;

pub use service::{
    AuthConfig, Config, ConfigError, DispatchConfig, ENV_ENVIRONMENT, ENV_JWT_SECRET,
    ServerConfig, StorageConfig,
};
