/// Account management
///
/// Persistent account records, their archive/delete lifecycle, and the
/// provisioning service that validates and creates new accounts.

mod creator;
mod store;

pub use creator::AccountCreator;
pub use store::AccountStore;

use crate::db::account::{Account, AccountState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account creation form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Account creation response body
#[derive(Debug, Clone, Serialize)]
pub struct CreateAccountResponse {
    pub id_token: String,
}

/// Account view returned by the private lookup endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub id: i64,
    pub username: String,
    pub state: AccountState,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            state: account.state(),
            id: account.id,
            username: account.username,
            archived_at: account.archived_at,
            deleted_at: account.deleted_at,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
