/// Account provisioning: input validation, hashing, insert
use crate::{
    account::AccountStore,
    config::PolicyConfig,
    db::account::Account,
    error::{codes, AuthnError, AuthnResult, FieldError},
    metrics,
    password::PasswordHasher,
};
use std::sync::Arc;

/// Creates accounts from raw client input
pub struct AccountCreator {
    store: AccountStore,
    hasher: Arc<dyn PasswordHasher>,
    policy: PolicyConfig,
}

impl AccountCreator {
    pub fn new(store: AccountStore, hasher: Arc<dyn PasswordHasher>, policy: PolicyConfig) -> Self {
        Self {
            store,
            hasher,
            policy,
        }
    }

    /// Validate, hash and insert a new account.
    ///
    /// Every field is checked before returning so the client sees all
    /// problems at once. A username collision in the store comes back as a
    /// `TAKEN` validation error.
    pub async fn create(&self, username: &str, password: &str) -> AuthnResult<Account> {
        let username = username.trim();

        let errors = self.validate(username, password);
        if !errors.is_empty() {
            metrics::ACCOUNT_VALIDATION_FAILURES_TOTAL.inc();
            tracing::debug!(?errors, "account input rejected");
            return Err(AuthnError::Validation(errors));
        }

        let digest = self.hasher.hash(password).await?;

        match self.store.create(username, &digest).await {
            Ok(account) => {
                metrics::ACCOUNTS_CREATED_TOTAL.inc();
                tracing::info!(account_id = account.id, "account created");
                Ok(account)
            }
            Err(AuthnError::Conflict(_)) => {
                metrics::ACCOUNT_VALIDATION_FAILURES_TOTAL.inc();
                tracing::debug!("username already taken");
                Err(AuthnError::Validation(vec![FieldError::new(
                    "username",
                    codes::TAKEN,
                )]))
            }
            Err(e) => Err(e),
        }
    }

    fn validate(&self, username: &str, password: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if username.is_empty() {
            errors.push(FieldError::new("username", codes::MISSING));
        } else if username.chars().count() < self.policy.username_min_length
            || (self.policy.username_is_email && !looks_like_email(username))
        {
            errors.push(FieldError::new("username", codes::FORMAT_INVALID));
        }

        if password.is_empty() {
            errors.push(FieldError::new("password", codes::MISSING));
        } else if password.chars().count() < self.policy.password_min_length
            || password == username
        {
            errors.push(FieldError::new("password", codes::INSECURE));
        }

        errors
    }
}

fn looks_like_email(username: &str) -> bool {
    let mut parts = username.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
