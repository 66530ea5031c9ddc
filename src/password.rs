/// One-way password hashing capability
use crate::error::{AuthnError, AuthnResult};
use async_trait::async_trait;

/// Hash and verify passwords without exposing the algorithm to callers
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> AuthnResult<String>;

    async fn verify(&self, digest: &str, password: &str) -> AuthnResult<bool>;
}

/// bcrypt-backed hasher
///
/// bcrypt is CPU bound, so both operations run on the blocking pool.
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> AuthnResult<String> {
        let password = password.to_owned();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthnError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(|e| AuthnError::PasswordHash(e.to_string()))
    }

    async fn verify(&self, digest: &str, password: &str) -> AuthnResult<bool> {
        let password = password.to_owned();
        let digest = digest.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &digest))
            .await
            .map_err(|e| AuthnError::Internal(format!("verification task failed: {}", e)))?
            .map_err(|e| AuthnError::PasswordHash(e.to_string()))
    }
}
