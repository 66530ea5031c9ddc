/// Refresh token storage and signed token issuance
pub mod issuer;
pub mod refresh;

pub use issuer::TokenIssuer;
pub use refresh::{RedisRefreshTokenStore, RefreshTokenStore};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "authn";
