//! Bearer-token authentication
//!
//! Requests to the `/v0` routes carry `Authorization: Bearer <token>` where the
//! token is an HS256 JWT minted by `vigil token`. The token subject is the
//! user id that results are stored under.

mod jwt;

pub use jwt::{AuthError, Claims, DEFAULT_TOKEN_EXPIRY, JwtConfig, generate_token, validate_token};
