/// Configuration management for the authn core
use crate::error::{AuthnError, AuthnResult};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Canonical base URL, used as the identity token issuer
    pub base_url: String,
    pub host: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub redis_url: String,
    pub redis_key_prefix: String,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_signing_key: Vec<u8>,
    pub identity_signing_key: Vec<u8>,
    /// Relying-party identifier placed in the identity token audience
    pub audience: String,
    pub refresh_token_ttl: Duration,
    pub access_token_ttl: Duration,
    pub bcrypt_cost: u32,
    /// HTTP Basic credentials for private endpoints
    pub api_credentials: Option<ApiCredentials>,
}

#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

/// Input rules applied by the account creation service
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub username_min_length: usize,
    pub password_min_length: usize,
    pub username_is_email: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            username_min_length: 3,
            password_min_length: 8,
            username_is_email: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> AuthnResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AuthnError::Config(format!("{} has an invalid value", name))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthnResult<Self> {
        dotenv::dotenv().ok();

        let base_url = env::var("AUTHN_URL")
            .map_err(|_| AuthnError::Config("AUTHN_URL required".to_string()))?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("PORT", 3000u16)?;

        let database_path = env::var("DATABASE_URL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/authn.sqlite"));
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let redis_key_prefix =
            env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "authn:".to_string());

        let session_signing_key = env::var("SESSION_SIGNING_KEY")
            .map_err(|_| AuthnError::Config("SESSION_SIGNING_KEY required".to_string()))?
            .into_bytes();
        let identity_signing_key = env::var("IDENTITY_SIGNING_KEY")
            .map_err(|_| AuthnError::Config("IDENTITY_SIGNING_KEY required".to_string()))?
            .into_bytes();
        let audience = env::var("APP_DOMAINS").unwrap_or_else(|_| "localhost".to_string());
        let refresh_token_ttl = Duration::from_secs(parse_or("REFRESH_TOKEN_TTL", 2_592_000u64)?);
        let access_token_ttl = Duration::from_secs(parse_or("ACCESS_TOKEN_TTL", 3600u64)?);
        let bcrypt_cost = parse_or("BCRYPT_COST", 11u32)?;

        let api_credentials = match (env::var("HTTP_AUTH_USERNAME"), env::var("HTTP_AUTH_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(ApiCredentials { username, password }),
            _ => None,
        };

        let defaults = PolicyConfig::default();
        let policy = PolicyConfig {
            username_min_length: parse_or("USERNAME_MIN_LENGTH", defaults.username_min_length)?,
            password_min_length: parse_or("PASSWORD_MIN_LENGTH", defaults.password_min_length)?,
            username_is_email: parse_or("USERNAME_IS_EMAIL", defaults.username_is_email)?,
        };

        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "authn_core=debug,tower_http=debug".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                base_url,
                host,
                port,
            },
            storage: StorageConfig {
                database_path,
                redis_url,
                redis_key_prefix,
            },
            authentication: AuthConfig {
                session_signing_key,
                identity_signing_key,
                audience,
                refresh_token_ttl,
                access_token_ttl,
                bcrypt_cost,
                api_credentials,
            },
            policy,
            logging: LoggingConfig { level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthnResult<()> {
        url::Url::parse(&self.service.base_url)
            .map_err(|e| AuthnError::Config(format!("AUTHN_URL is not a valid URL: {}", e)))?;

        let auth = &self.authentication;
        if auth.session_signing_key.len() < 32 || auth.identity_signing_key.len() < 32 {
            return Err(AuthnError::Config(
                "Signing keys must be at least 32 bytes".to_string(),
            ));
        }

        if auth.session_signing_key == auth.identity_signing_key {
            return Err(AuthnError::Config(
                "Session and identity signing keys must differ".to_string(),
            ));
        }

        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&auth.bcrypt_cost) {
            return Err(AuthnError::Config(format!(
                "BCRYPT_COST must be between {} and {}",
                BCRYPT_MIN_COST, BCRYPT_MAX_COST
            )));
        }

        if auth.refresh_token_ttl.is_zero() {
            return Err(AuthnError::Config("REFRESH_TOKEN_TTL must be positive".to_string()));
        }

        Ok(())
    }

    /// Socket address the server binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

#[cfg(test)]
impl ServerConfig {
    /// Minimal configuration with cheap hashing for unit tests
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                base_url: "https://authn.example.com".to_string(),
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageConfig {
                database_path: PathBuf::from(":memory:"),
                redis_url: "redis://127.0.0.1:6379/12".to_string(),
                redis_key_prefix: "authn-test:".to_string(),
            },
            authentication: AuthConfig {
                session_signing_key: b"session-signing-key-for-tests-only!!".to_vec(),
                identity_signing_key: b"identity-signing-key-for-tests-only!".to_vec(),
                audience: "app.example.com".to_string(),
                refresh_token_ttl: Duration::from_secs(60),
                access_token_ttl: Duration::from_secs(3600),
                bcrypt_cost: 4,
                api_credentials: Some(ApiCredentials {
                    username: "admin".to_string(),
                    password: "secret".to_string(),
                }),
            },
            policy: PolicyConfig::default(),
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}
