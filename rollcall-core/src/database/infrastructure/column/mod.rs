//! Wide-column account storage.
//!
//! A wide-column store has no multi-table transactions and no unique
//! constraint, so uniqueness of the normalized email and consistency between
//! the two tables are maintained here by ordering writes:
//!
//! * `accounts_map_id`: id -> full record (authoritative)
//! * `accounts_map_email`: normalized email -> id (lookup index)
//!
//! Creation claims the email entry before writing the record and releases it
//! if the record write fails. Readers only trust an index entry whose record
//! exists and still carries that email, so a half-applied write never
//! surfaces as a phantom account.
//!
//! The existence check and the claim are two separate statements. Two
//! creates racing on the same address can both pass the check; the later
//! claim wins the index and the earlier record becomes unreachable by email.

pub mod memory;
pub mod scylla;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use rollcall_model::{Account, AccountId, NewAccount, normalize_email};
use tracing::{info, warn};

use crate::{
    database::{
        cursor::{AccountPage, PageCursor, effective_page_size},
        ports::accounts::AccountStore,
    },
    error::{AccountError, Result},
};

pub use self::memory::{MemoryColumnFamilies, TableOp};
pub use self::scylla::{ScyllaColumnFamilies, ScyllaSettings};

/// Token column searchable through a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenColumn {
    Confirmation,
    PasswordReset,
}

impl TokenColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            TokenColumn::Confirmation => "confirmation_token",
            TokenColumn::PasswordReset => "password_reset_token",
        }
    }

    fn value(self, account: &Account) -> Option<&str> {
        match self {
            TokenColumn::Confirmation => account.confirmation_token.as_deref(),
            TokenColumn::PasswordReset => {
                account.password_reset_token.as_deref()
            }
        }
    }
}

/// Single-statement table operations of a wide-column store.
///
/// Each method maps onto one statement against one table; none of them
/// coordinates across tables. Email keys are always passed normalized.
#[async_trait]
pub trait ColumnFamilies: Send + Sync {
    fn driver_name(&self) -> &'static str;

    async fn get_record(&self, id: AccountId) -> Result<Option<Account>>;
    /// Upsert the full record keyed by `account.id`.
    async fn put_record(&self, account: &Account) -> Result<()>;
    async fn delete_record(&self, id: AccountId) -> Result<()>;

    async fn get_email(&self, email: &str) -> Result<Option<AccountId>>;
    async fn put_email(&self, email: &str, id: AccountId) -> Result<()>;
    async fn delete_email(&self, email: &str) -> Result<()>;

    async fn find_by_token(
        &self,
        column: TokenColumn,
        token: &str,
    ) -> Result<Option<Account>>;

    /// Up to `limit` records in the table's stable key order, strictly
    /// after `after` when given.
    async fn scan(
        &self,
        after: Option<AccountId>,
        limit: u32,
    ) -> Result<Vec<Account>>;

    async fn create_schema(&self) -> Result<()>;
    async fn truncate(&self) -> Result<()>;
    async fn close(&self);
}

/// [`AccountStore`] over any [`ColumnFamilies`] driver.
#[derive(Debug)]
pub struct WideColumnAccountStore<F> {
    tables: F,
}

impl<F: ColumnFamilies> WideColumnAccountStore<F> {
    pub fn new(tables: F) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &F {
        &self.tables
    }

    /// Follow the email index to an authoritative record.
    ///
    /// Entries whose record is gone, or whose record has since moved to a
    /// different address, resolve to `NotFound`.
    async fn resolve_email(&self, normalized: &str) -> Result<Account> {
        let Some(id) = self.tables.get_email(normalized).await? else {
            return Err(AccountError::NotFound);
        };

        let Some(account) = self.tables.get_record(id).await? else {
            warn!(
                "Email index entry for {} points at missing account {}",
                normalized, id
            );
            return Err(AccountError::NotFound);
        };

        if account.normalized_email() != normalized {
            warn!(
                "Stale email index entry for {} (account {})",
                normalized, id
            );
            return Err(AccountError::NotFound);
        }

        Ok(account)
    }

    /// Err(EmailExists) unless `normalized` is free or owned by `owner`.
    async fn ensure_email_available(
        &self,
        normalized: &str,
        owner: Option<AccountId>,
    ) -> Result<()> {
        match self.resolve_email(normalized).await {
            Ok(existing) if Some(existing.id) == owner => Ok(()),
            Ok(_) => Err(AccountError::EmailExists),
            Err(AccountError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Compensation for a claim whose record write failed.
    async fn release_email(&self, normalized: &str, id: AccountId) {
        match self.tables.get_email(normalized).await {
            Ok(Some(owner)) if owner != id => return,
            Ok(_) => {}
            Err(err) => {
                warn!(
                    "Could not inspect email index for {} during cleanup: {}",
                    normalized, err
                );
            }
        }

        if let Err(err) = self.tables.delete_email(normalized).await {
            warn!(
                "Failed to release email index entry for {}: {}",
                normalized, err
            );
        }
    }

    async fn redeem_token(
        &self,
        column: TokenColumn,
        token: &str,
        apply: impl FnOnce(&mut Account) + Send,
    ) -> Result<Account> {
        if token.is_empty() {
            return Err(AccountError::NotFound);
        }

        // Secondary-index read then write; a concurrent redemption of the same
        // token between the two can succeed twice.
        let mut account = self
            .tables
            .find_by_token(column, token)
            .await?
            .filter(|account| column.value(account) == Some(token))
            .ok_or(AccountError::NotFound)?;

        apply(&mut account);
        self.tables.put_record(&account).await?;
        Ok(account)
    }
}

#[async_trait]
impl<F: ColumnFamilies> AccountStore for WideColumnAccountStore<F> {
    fn backend_name(&self) -> &'static str {
        self.tables.driver_name()
    }

    async fn create(&self, account: NewAccount) -> Result<Account> {
        account.validate()?;
        let normalized = account.normalized_email();

        self.ensure_email_available(&normalized, None).await?;

        // CQL timestamps carry milliseconds.
        let created_at = Utc::now().trunc_subsecs(3);
        let account = account.into_account(AccountId::generate(), created_at);

        // TODO: claim with `INSERT ... IF NOT EXISTS` to close the
        // double-create race.
        self.tables.put_email(&normalized, account.id).await?;

        if let Err(err) = self.tables.put_record(&account).await {
            warn!(
                "Account write failed for {}, releasing email claim",
                account.id
            );
            self.release_email(&normalized, account.id).await;
            return Err(err);
        }

        info!("Created account {} ({})", account.id, normalized);
        Ok(account)
    }

    async fn read_by_id(&self, id: AccountId) -> Result<Account> {
        self.tables.get_record(id).await?.ok_or(AccountError::NotFound)
    }

    async fn read_by_email(&self, email: &str) -> Result<Account> {
        self.resolve_email(&normalize_email(email)).await
    }

    async fn update(&self, account: &Account) -> Result<Account> {
        account.validate()?;

        let current = self
            .tables
            .get_record(account.id)
            .await?
            .ok_or(AccountError::NotFound)?;

        let old_email = current.normalized_email();
        let new_email = account.normalized_email();
        let email_changed = old_email != new_email;

        // Only profile fields come from the caller; credentials and tokens
        // stay as currently stored.
        let mut updated = current;
        updated.name = account.name.clone();
        updated.email = account.email.clone();
        updated.images = account.images.clone();
        updated.metadata = account.metadata.clone();

        if email_changed {
            self.ensure_email_available(&new_email, Some(account.id)).await?;
            self.tables.put_email(&new_email, account.id).await?;
        }

        if let Err(err) = self.tables.put_record(&updated).await {
            if email_changed {
                self.release_email(&new_email, account.id).await;
            }
            return Err(err);
        }

        if email_changed
            && let Err(err) = self.tables.delete_email(&old_email).await
        {
            // Readers reject the stale entry, so the update still stands.
            warn!(
                "Failed to remove old email index entry {}: {}",
                old_email, err
            );
        }

        info!("Updated account {}", updated.id);
        Ok(updated)
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let current = self
            .tables
            .get_record(id)
            .await?
            .ok_or(AccountError::NotFound)?;
        let normalized = current.normalized_email();

        // Record first: if the index delete then fails, the entry dangles
        // and reads as NotFound instead of freeing the address early.
        self.tables.delete_record(id).await?;

        if self.tables.get_email(&normalized).await? == Some(id) {
            self.tables.delete_email(&normalized).await?;
        }

        info!("Deleted account {}", id);
        Ok(())
    }

    async fn list(&self, page_size: u32, cursor: &str) -> Result<AccountPage> {
        let page_size = effective_page_size(page_size);
        let after = PageCursor::decode(cursor)?.keyset()?;
        let accounts = self.tables.scan(after, page_size).await?;
        Ok(AccountPage::keyset(accounts, page_size))
    }

    async fn issue_password_reset_token(
        &self,
        email: &str,
        token: &str,
    ) -> Result<Account> {
        let mut account = self.resolve_email(&normalize_email(email)).await?;
        account.password_reset_token = Some(token.to_string());
        self.tables.put_record(&account).await?;
        Ok(account)
    }

    async fn redeem_password_reset_token(
        &self,
        token: &str,
        hashed_password: &str,
    ) -> Result<Account> {
        let hashed_password = hashed_password.to_string();
        let account = self
            .redeem_token(TokenColumn::PasswordReset, token, move |account| {
                account.hashed_password = hashed_password;
                account.password_reset_token = None;
            })
            .await?;
        info!("Password reset for account {}", account.id);
        Ok(account)
    }

    async fn redeem_confirmation_token(&self, token: &str) -> Result<Account> {
        let account = self
            .redeem_token(TokenColumn::Confirmation, token, |account| {
                account.confirmation_token = None;
            })
            .await?;
        info!("Confirmed account {}", account.id);
        Ok(account)
    }

    async fn migrate(&self) -> Result<()> {
        self.tables.create_schema().await
    }

    async fn truncate(&self) -> Result<()> {
        self.tables.truncate().await
    }

    async fn close(&self) {
        self.tables.close().await;
    }
}
