use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rollcall_model::{
    Account, AccountId, AccountImage, NewAccount, normalize_email,
};
use sqlx::{PgPool, types::Json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    MIGRATOR,
    database::{
        cursor::{AccountPage, PageCursor, effective_page_size},
        ports::accounts::AccountStore,
    },
    error::{AccountError, Result},
};

const EMAIL_UNIQUE_CONSTRAINT: &str = "accounts_email_lower_key";

const ACCOUNT_COLUMNS: &str = "id, name, email, hashed_password, \
     confirmation_token, password_reset_token, images, metadata, created_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    hashed_password: String,
    confirmation_token: Option<String>,
    password_reset_token: Option<String>,
    images: Json<Vec<AccountImage>>,
    metadata: Json<HashMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: AccountId(row.id),
            name: row.name,
            email: row.email,
            hashed_password: row.hashed_password,
            confirmation_token: row.confirmation_token,
            password_reset_token: row.password_reset_token,
            images: row.images.0,
            metadata: row.metadata.0,
            created_at: row.created_at,
        }
    }
}

/// Map a write failure, turning a violation of the normalized-email index
/// into [`AccountError::EmailExists`].
fn map_write_error(e: sqlx::Error, action: &str) -> AccountError {
    if let Some(db_err) = e.as_database_error()
        && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT)
    {
        return AccountError::EmailExists;
    }
    AccountError::Backend(format!("Failed to {}: {}", action, e))
}

/// PostgreSQL-backed implementation of the [`AccountStore`] port.
///
/// Uniqueness is enforced by a unique index on `lower(btrim(email))`, so two
/// concurrent creates for the same address cannot both commit. Credential
/// redemption uses single-statement `UPDATE ... RETURNING` and is atomic.
/// Listing pages by offset over `ORDER BY id`.
#[derive(Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl fmt::Debug for PostgresAccountStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresAccountStore")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Account> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {predicate}");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!("Failed to read account: {}", e))
            })?;

        row.map(Account::from).ok_or(AccountError::NotFound)
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, account: NewAccount) -> Result<Account> {
        account.validate()?;
        let normalized = account.normalized_email();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                AccountError::Backend(format!(
                    "Failed to start transaction: {}",
                    e
                ))
            })?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(\
                 SELECT 1 FROM accounts WHERE lower(btrim(email)) = $1\
             )",
        )
        .bind(&normalized)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AccountError::Backend(format!("Failed to check email: {}", e))
        })?;

        if taken {
            return Err(AccountError::EmailExists);
        }

        // v7 ids and millisecond timestamps, as in the wide-column store.
        let id = AccountId::generate();
        let created_at = Utc::now().trunc_subsecs(3);

        let sql = format!(
            "INSERT INTO accounts \
                 (id, name, email, hashed_password, confirmation_token, \
                  images, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.to_uuid())
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.hashed_password)
            .bind(&account.confirmation_token)
            .bind(Json(&account.images))
            .bind(Json(&account.metadata))
            .bind(created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "create account"))?;

        tx.commit()
            .await
            .map_err(|e| map_write_error(e, "commit account"))?;

        let created = Account::from(row);
        info!("Created account {} ({})", created.id, normalized);
        Ok(created)
    }

    async fn read_by_id(&self, id: AccountId) -> Result<Account> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!("Failed to read account: {}", e))
            })?;

        row.map(Account::from).ok_or(AccountError::NotFound)
    }

    async fn read_by_email(&self, email: &str) -> Result<Account> {
        self.fetch_one_where(
            "lower(btrim(email)) = $1",
            &normalize_email(email),
        )
        .await
    }

    async fn update(&self, account: &Account) -> Result<Account> {
        account.validate()?;

        // Credentials and tokens change only through the redemption
        // statements below.
        let sql = format!(
            "UPDATE accounts SET \
                 name = $2, email = $3, images = $4, metadata = $5 \
             WHERE id = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id.to_uuid())
            .bind(&account.name)
            .bind(&account.email)
            .bind(Json(&account.images))
            .bind(Json(&account.metadata))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "update account"))?;

        let updated = row.map(Account::from).ok_or(AccountError::NotFound)?;
        info!("Updated account {}", updated.id);
        Ok(updated)
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!(
                    "Failed to delete account: {}",
                    e
                ))
            })?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }

        info!("Deleted account {}", id);
        Ok(())
    }

    async fn list(&self, page_size: u32, cursor: &str) -> Result<AccountPage> {
        let page_size = effective_page_size(page_size);
        let offset = PageCursor::decode(cursor)?.offset()?;
        debug!("Listing accounts: offset={} limit={}", offset, page_size);

        let start = i64::try_from(offset)
            .map_err(|_| AccountError::invalid("page_token"))?;

        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             ORDER BY id LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(i64::from(page_size))
            .bind(start)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!("Failed to list accounts: {}", e))
            })?;

        let accounts = rows.into_iter().map(Account::from).collect();
        Ok(AccountPage::offset(accounts, page_size, offset))
    }

    async fn issue_password_reset_token(
        &self,
        email: &str,
        token: &str,
    ) -> Result<Account> {
        let sql = format!(
            "UPDATE accounts SET password_reset_token = $2 \
             WHERE lower(btrim(email)) = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(normalize_email(email))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!(
                    "Failed to store reset token: {}",
                    e
                ))
            })?;

        row.map(Account::from).ok_or(AccountError::NotFound)
    }

    async fn redeem_password_reset_token(
        &self,
        token: &str,
        hashed_password: &str,
    ) -> Result<Account> {
        if token.is_empty() {
            return Err(AccountError::NotFound);
        }

        let sql = format!(
            "UPDATE accounts \
             SET hashed_password = $2, password_reset_token = NULL \
             WHERE password_reset_token = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(token)
            .bind(hashed_password)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!(
                    "Failed to reset password: {}",
                    e
                ))
            })?;

        let account = row.map(Account::from).ok_or(AccountError::NotFound)?;
        info!("Password reset for account {}", account.id);
        Ok(account)
    }

    async fn redeem_confirmation_token(&self, token: &str) -> Result<Account> {
        if token.is_empty() {
            return Err(AccountError::NotFound);
        }

        let sql = format!(
            "UPDATE accounts SET confirmation_token = NULL \
             WHERE confirmation_token = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!(
                    "Failed to confirm account: {}",
                    e
                ))
            })?;

        let account = row.map(Account::from).ok_or(AccountError::NotFound)?;
        info!("Confirmed account {}", account.id);
        Ok(account)
    }

    async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!("Migration failed: {}", e))
            })?;
        info!("Applied account schema migrations");
        Ok(())
    }

    async fn truncate(&self) -> Result<()> {
        sqlx::query("TRUNCATE TABLE accounts")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AccountError::Backend(format!(
                    "Failed to truncate accounts: {}",
                    e
                ))
            })?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
