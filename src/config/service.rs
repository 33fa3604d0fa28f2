//! Service configuration types
//!
//! Defines the structure of the service configuration file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::auth::{DEFAULT_TOKEN_EXPIRY, JwtConfig};
use crate::execution::{DEFAULT_TIMEOUT, Dispatcher};
use crate::store::{DEFAULT_HISTORY_LIMIT, InMemoryStore};

/// Environment variable overriding `auth.jwt_secret`
pub const ENV_JWT_SECRET: &str = "VIGIL_JWT_SECRET";
/// Environment variable overriding `server.environment`
pub const ENV_ENVIRONMENT: &str = "VIGIL_ENVIRONMENT";

/// Errors that can occur during configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment name (`local`, `staging`, `production`, ...)
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "local".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

impl ServerConfig {
    pub fn is_local(&self) -> bool {
        self.environment.eq_ignore_ascii_case("local")
    }

    /// Host and port to bind; hostnames are resolved when the listener binds
    pub fn bind_address(&self) -> Result<(String, u16), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "server.host '{}' is not a valid host",
                self.host
            )));
        }
        Ok((host.to_string(), self.port))
    }
}

/// Authentication settings
///
/// Without a secret, authentication is disabled and every request is handled
/// as the anonymous user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Lifetime of minted tokens
    #[serde(default = "default_token_expiry", with = "humantime_serde")]
    pub token_expiry: Duration,
}

fn default_token_expiry() -> Duration {
    DEFAULT_TOKEN_EXPIRY
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiry: default_token_expiry(),
        }
    }
}

impl AuthConfig {
    /// Signing settings, if a secret is configured
    pub fn jwt_config(&self) -> Option<JwtConfig> {
        self.jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| JwtConfig::new(secret).with_expiry(self.token_expiry))
    }
}

/// Probe dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-request timeout when a submission sets none
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Maximum probes in flight per run (unset = one per endpoint)
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            max_concurrency: None,
        }
    }
}

/// Result storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Runs retained per user
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.default_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "dispatch.default_timeout must be greater than zero".into(),
            ));
        }
        if self.dispatch.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "dispatch.max_concurrency must be at least 1".into(),
            ));
        }
        if self.storage.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "storage.history_limit must be at least 1".into(),
            ));
        }
        if self.auth.token_expiry.is_zero() {
            return Err(ConfigError::Invalid(
                "auth.token_expiry must be greater than zero".into(),
            ));
        }
        self.server.bind_address()?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secret) = lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(environment) = lookup(ENV_ENVIRONMENT).filter(|s| !s.is_empty()) {
            self.server.environment = environment;
        }
        self
    }

    /// Dispatcher configured from the `dispatch` section
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new()
            .with_default_timeout(self.dispatch.default_timeout)
            .with_max_concurrency(self.dispatch.max_concurrency)
    }

    /// Result store configured from the `storage` section
    pub fn store(&self) -> InMemoryStore {
        InMemoryStore::new(self.storage.history_limit)
    }

    /// Generate a default configuration
    pub fn default_config() -> Self {
        Config {
            server: ServerConfig::default(),
            auth: AuthConfig {
                jwt_secret: Some("change-me".to_string()),
                token_expiry: default_token_expiry(),
            },
            dispatch: DispatchConfig {
                default_timeout: default_timeout(),
                max_concurrency: Some(64),
            },
            storage: StorageConfig::default(),
        }
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
