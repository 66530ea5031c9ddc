/// Account database model
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state derived from the archive/delete timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    Active,
    Archived,
    Deleted,
    ArchivedThenDeleted,
}

impl Account {
    pub fn state(&self) -> AccountState {
        match (self.archived_at, self.deleted_at) {
            (None, None) => AccountState::Active,
            (Some(_), None) => AccountState::Archived,
            (None, Some(_)) => AccountState::Deleted,
            (Some(_), Some(_)) => AccountState::ArchivedThenDeleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        let now = Utc::now();
        Account {
            id: 1,
            username: "someone@example.com".to_string(),
            password_digest: "$2b$04$digest".to_string(),
            archived_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_state_from_timestamps() {
        let mut account = account();
        assert_eq!(account.state(), AccountState::Active);

        account.archived_at = Some(Utc::now());
        assert_eq!(account.state(), AccountState::Archived);

        account.deleted_at = Some(Utc::now());
        assert_eq!(account.state(), AccountState::ArchivedThenDeleted);

        account.archived_at = None;
        assert_eq!(account.state(), AccountState::Deleted);
    }

    #[test]
    fn test_digest_never_serialized() {
        let json = serde_json::to_string(&account()).unwrap();
        assert!(!json.contains("password_digest"));
        assert!(!json.contains("$2b$04$digest"));
    }
}
