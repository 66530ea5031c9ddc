/// Application context and dependency injection
use crate::{
    account::{AccountCreator, AccountStore},
    config::ServerConfig,
    db,
    error::AuthnResult,
    health::HealthAggregator,
    password::BcryptHasher,
    token::{RedisRefreshTokenStore, RefreshTokenStore, TokenIssuer},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub account_store: AccountStore,
    pub account_creator: Arc<AccountCreator>,
    pub token_issuer: Arc<TokenIssuer>,
    pub health: Arc<HealthAggregator>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AuthnResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize account database
        let account_db =
            db::create_pool(&config.storage.database_path, db::DatabaseOptions::default()).await?;
        db::run_migrations(&account_db).await?;
        db::test_connection(&account_db).await?;

        // Initialize refresh token store
        let refresh_tokens = RedisRefreshTokenStore::connect(
            &config.storage.redis_url,
            &config.storage.redis_key_prefix,
            config.authentication.refresh_token_ttl,
        )
        .await?;

        Ok(Self::from_parts(config, account_db, Arc::new(refresh_tokens)))
    }

    /// Wire the services around already-open store handles
    pub fn from_parts(
        config: ServerConfig,
        account_db: SqlitePool,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        let account_store = AccountStore::new(account_db);
        let hasher = Arc::new(BcryptHasher::new(config.authentication.bcrypt_cost));
        let account_creator = Arc::new(AccountCreator::new(
            account_store.clone(),
            hasher,
            config.policy.clone(),
        ));
        let token_issuer = Arc::new(TokenIssuer::new(&config, refresh_tokens.clone()));
        let health = Arc::new(HealthAggregator::new(account_store.clone(), refresh_tokens));

        Self {
            config: Arc::new(config),
            account_store,
            account_creator,
            token_issuer,
            health,
        }
    }
}
