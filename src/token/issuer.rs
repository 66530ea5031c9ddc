/// Session and identity token minting
use crate::{
    config::ServerConfig,
    db::account::Account,
    error::{AuthnError, AuthnResult},
    metrics,
    token::RefreshTokenStore,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Claims carried by the session cookie.
///
/// The subject is a refresh token handle, never the account id, so a session
/// token is only as good as the handle it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub azp: String,
}

/// Claims carried by the identity token handed to relying parties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: i64,
}

/// Tokens minted for one successful authentication
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_token: String,
    pub identity_token: String,
}

/// Mints session and identity tokens, each with its own signing key
pub struct TokenIssuer {
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    identity_encoding: EncodingKey,
    base_url: String,
    audience: String,
    access_token_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &ServerConfig, refresh_tokens: Arc<dyn RefreshTokenStore>) -> Self {
        let auth = &config.authentication;
        Self {
            refresh_tokens,
            session_encoding: EncodingKey::from_secret(&auth.session_signing_key),
            session_decoding: DecodingKey::from_secret(&auth.session_signing_key),
            identity_encoding: EncodingKey::from_secret(&auth.identity_signing_key),
            base_url: config.service.base_url.clone(),
            audience: auth.audience.clone(),
            access_token_ttl: auth.access_token_ttl,
        }
    }

    /// Mint a refresh handle plus the session and identity tokens for an account.
    ///
    /// Nothing is returned unless the handle was stored. If signing fails
    /// afterwards the handle is revoked again.
    pub async fn issue_session(&self, account: &Account) -> AuthnResult<IssuedSession> {
        let handle = self.refresh_tokens.create(account.id).await?;

        match self.sign_pair(&handle, account) {
            Ok(issued) => {
                metrics::SESSIONS_ISSUED_TOTAL.inc();
                tracing::info!(account_id = account.id, "session issued");
                Ok(issued)
            }
            Err(e) => {
                tracing::error!(account_id = account.id, error = %e, "token signing failed");
                if let Err(revoke_err) = self.refresh_tokens.revoke(&handle).await {
                    tracing::warn!(error = %revoke_err, "failed to revoke orphaned refresh token");
                }
                Err(e)
            }
        }
    }

    fn sign_pair(&self, handle: &str, account: &Account) -> AuthnResult<IssuedSession> {
        let now = Utc::now().timestamp();

        let session = SessionClaims {
            iss: self.base_url.clone(),
            sub: handle.to_string(),
            aud: self.base_url.clone(),
            iat: now,
            azp: self.audience.clone(),
        };
        let session_token = encode(&Header::new(Algorithm::HS256), &session, &self.session_encoding)?;

        let identity = IdentityClaims {
            iss: self.base_url.clone(),
            sub: account.id.to_string(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.access_token_ttl.as_secs() as i64,
            auth_time: now,
        };
        let identity_token =
            encode(&Header::new(Algorithm::HS256), &identity, &self.identity_encoding)?;

        Ok(IssuedSession {
            session_token,
            identity_token,
        })
    }

    fn verify_session(&self, session_token: &str) -> AuthnResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.set_issuer(&[&self.base_url]);
        validation.set_audience(&[&self.base_url]);

        decode::<SessionClaims>(session_token, &self.session_decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                AuthnError::Unauthorized
            })
    }

    /// Resolve a session token to its account id.
    ///
    /// Requires both a valid signature and a live refresh handle; the
    /// handle's lifetime is extended on success.
    pub async fn resolve_session(&self, session_token: &str) -> AuthnResult<i64> {
        let claims = self.verify_session(session_token)?;

        let account_id = self.refresh_tokens.find(&claims.sub).await?;
        self.refresh_tokens.touch(&claims.sub).await?;

        Ok(account_id)
    }

    /// Revoke the refresh handle named by a session token
    pub async fn revoke_session(&self, session_token: &str) -> AuthnResult<()> {
        let claims = self.verify_session(session_token)?;
        self.refresh_tokens.revoke(&claims.sub).await?;

        tracing::info!("session revoked");
        Ok(())
    }
}
