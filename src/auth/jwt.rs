//! JWT generation and validation
//!
//! Tokens are HS256-signed and carry a [`Claims`] payload.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default token lifetime
pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from token handling
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Claims embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id results are stored under
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration (UTC unix timestamp)
    pub exp: i64,
    /// Issued at (UTC unix timestamp)
    pub iat: i64,
    /// Not before (UTC unix timestamp)
    pub nbf: i64,
}

/// Signing settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret
    pub secret: String,
    /// Lifetime of newly minted tokens
    pub expiry: Duration,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiry: DEFAULT_TOKEN_EXPIRY,
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }
}

/// Mint a token for `user_id`
pub fn generate_token(
    user_id: &str,
    email: Option<&str>,
    config: &JwtConfig,
) -> Result<String, AuthError> {
    if config.secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        exp: now + config.expiry.as_secs() as i64,
        iat: now,
        nbf: now,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?)
}

/// Validate a token's signature and expiry and return its claims
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, AuthError> {
    if config.secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret-that-is-long-enough-for-hmac")
    }

    #[test]
    fn test_generate_and_validate() {
        let config = config();
        let token = generate_token("user-42", Some("ops@example.com"), &config).unwrap();

        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.email.as_deref(), Some("ops@example.com"));
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token_fails() {
        let config = config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            email: None,
            // well past the default 60 second leeway
            exp: now - 300,
            iat: now - 600,
            nbf: now - 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = generate_token("user-1", None, &JwtConfig::new("secret-alpha")).unwrap();
        assert!(validate_token(&token, &JwtConfig::new("secret-bravo")).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = JwtConfig::new("");
        assert!(matches!(
            generate_token("user-1", None, &config),
            Err(AuthError::MissingSecret)
        ));
    }
}
