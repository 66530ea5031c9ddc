/// Persistent account records and their archive/delete lifecycle
use crate::{
    db::account::Account,
    error::{AuthnError, AuthnResult},
    metrics,
};
use chrono::Utc;
use sqlx::SqlitePool;

const ACCOUNT_COLUMNS: &str =
    "id, username, password_digest, archived_at, deleted_at, created_at, updated_at";

/// Account store backed by the relational database
#[derive(Clone)]
pub struct AccountStore {
    db: SqlitePool,
}

impl AccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new account.
    ///
    /// Uniqueness among non-deleted accounts is enforced by a partial unique
    /// index, so two concurrent inserts for the same username cannot both
    /// succeed. The losing insert surfaces as `Conflict`.
    pub async fn create(&self, username: &str, password_digest: &str) -> AuthnResult<Account> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO account (username, password_digest, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(username)
        .bind(password_digest)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AuthnError::Conflict(format!("username {} already taken", username))
            }
            other => AuthnError::Database(other),
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password_digest: password_digest.to_string(),
            archived_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Find an account by id, whatever its lifecycle state
    pub async fn find(&self, id: i64) -> AuthnResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AuthnError::NotFound(format!("account {}", id)))
    }

    /// Mark an account archived. Re-archiving is a no-op.
    pub async fn archive(&self, id: i64) -> AuthnResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE account SET archived_at = ?1, updated_at = ?1
             WHERE id = ?2 AND archived_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            // Either already archived or unknown
            self.find(id).await?;
            tracing::debug!(account_id = id, "archive was a no-op");
            return Ok(());
        }

        metrics::record_transition("archive");
        tracing::info!(account_id = id, "account archived");
        Ok(())
    }

    /// Soft-delete an account. Deleting twice is a no-op.
    ///
    /// Once `deleted_at` is set the username no longer participates in the
    /// uniqueness index and may be claimed by a new account.
    pub async fn delete(&self, id: i64) -> AuthnResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE account SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            self.find(id).await?;
            tracing::debug!(account_id = id, "delete was a no-op");
            return Ok(());
        }

        metrics::record_transition("delete");
        tracing::info!(account_id = id, "account deleted");
        Ok(())
    }

    /// Physically remove an account row.
    ///
    /// Only for undoing a signup whose session could not be issued; the
    /// lifecycle operations above never remove rows.
    pub async fn discard(&self, id: i64) -> AuthnResult<()> {
        let result = sqlx::query("DELETE FROM account WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthnError::NotFound(format!("account {}", id)));
        }

        tracing::info!(account_id = id, "account discarded");
        Ok(())
    }

    /// Cheap round-trip used as the liveness probe
    pub async fn ping(&self) -> AuthnResult<()> {
        crate::db::test_connection(&self.db).await
    }
}
