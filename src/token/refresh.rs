/// Refresh token storage
///
/// Maps opaque, unguessable tokens to account ids. Expiry is delegated to
/// the backing store's native TTL, so an expired token and one that never
/// existed look the same to callers.

use crate::error::{AuthnError, AuthnResult};
use async_trait::async_trait;
use rand::RngCore;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Number of random bytes behind each token
const TOKEN_BYTES: usize = 32;

/// Ephemeral token-to-account mapping with store-managed expiry
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Mint a new token for the account, valid for the configured TTL
    async fn create(&self, account_id: i64) -> AuthnResult<String>;

    /// Resolve a token to its account. Expired and unknown tokens are both `NotFound`.
    async fn find(&self, token: &str) -> AuthnResult<i64>;

    /// Reset the token's remaining lifetime to the full TTL
    async fn touch(&self, token: &str) -> AuthnResult<()>;

    /// Remove a token. Removing an unknown token succeeds.
    async fn revoke(&self, token: &str) -> AuthnResult<()>;

    /// Liveness probe against the backend
    async fn ping(&self) -> AuthnResult<()>;
}

/// Generate a hex-encoded random token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Redis-backed refresh token store
#[derive(Clone)]
pub struct RedisRefreshTokenStore {
    connection: ConnectionManager,
    key_prefix: String,
    ttl: Duration,
}

impl RedisRefreshTokenStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str, key_prefix: &str, ttl: Duration) -> AuthnResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            AuthnError::Redis(e)
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            AuthnError::Redis(e)
        })?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            key_prefix: key_prefix.to_string(),
            ttl,
        })
    }

    fn build_key(&self, token: &str) -> String {
        token_key(&self.key_prefix, token)
    }
}

fn token_key(prefix: &str, token: &str) -> String {
    format!("{}refresh:{}", prefix, token)
}

#[async_trait]
impl RefreshTokenStore for RedisRefreshTokenStore {
    async fn create(&self, account_id: i64) -> AuthnResult<String> {
        let token = generate_token();
        let key = self.build_key(&token);

        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(&key, account_id, self.ttl.as_secs())
            .await
            .map_err(|e| {
                warn!("Redis SET failed for refresh token: {}", e);
                AuthnError::Redis(e)
            })?;

        debug!(account_id, "refresh token created");
        Ok(token)
    }

    async fn find(&self, token: &str) -> AuthnResult<i64> {
        let key = self.build_key(token);

        let mut conn = self.connection.clone();
        let account_id: Option<i64> = conn.get(&key).await.map_err(|e| {
            warn!("Redis GET failed for refresh token: {}", e);
            AuthnError::Redis(e)
        })?;

        account_id.ok_or_else(|| AuthnError::NotFound("refresh token".to_string()))
    }

    async fn touch(&self, token: &str) -> AuthnResult<()> {
        let key = self.build_key(token);

        let mut conn = self.connection.clone();
        let extended: bool = conn
            .expire(&key, self.ttl.as_secs() as i64)
            .await
            .map_err(|e| {
                warn!("Redis EXPIRE failed for refresh token: {}", e);
                AuthnError::Redis(e)
            })?;

        if !extended {
            return Err(AuthnError::NotFound("refresh token".to_string()));
        }

        Ok(())
    }

    async fn revoke(&self, token: &str) -> AuthnResult<()> {
        let key = self.build_key(token);

        let mut conn = self.connection.clone();
        let _: () = conn.del(&key).await.map_err(|e| {
            warn!("Redis DEL failed for refresh token: {}", e);
            AuthnError::Redis(e)
        })?;

        debug!("refresh token revoked");
        Ok(())
    }

    async fn ping(&self) -> AuthnResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        if pong != "PONG" {
            return Err(AuthnError::Internal(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }
}
