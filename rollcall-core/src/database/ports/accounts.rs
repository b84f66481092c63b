use async_trait::async_trait;
use rollcall_model::{Account, AccountId, NewAccount};

use crate::database::cursor::AccountPage;
use crate::error::Result;

/// Persistence contract shared by every account backend.
///
/// Implementations must behave identically from the caller's point of view:
/// email uniqueness is decided on the normalized address, lookups of unknown
/// keys fail with `NotFound`, and listing walks a stable order on `id`.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Short name used in logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Persist a new account, assigning its id and creation timestamp.
    async fn create(&self, account: NewAccount) -> Result<Account>;
    async fn read_by_id(&self, id: AccountId) -> Result<Account>;
    async fn read_by_email(&self, email: &str) -> Result<Account>;

    /// Overwrite the profile fields (`name`, `email`, `images`, `metadata`)
    /// of an existing account. Credentials and tokens are left as stored.
    async fn update(&self, account: &Account) -> Result<Account>;
    async fn delete(&self, id: AccountId) -> Result<()>;

    /// Return up to `page_size` accounts after `cursor` (empty = start).
    async fn list(&self, page_size: u32, cursor: &str) -> Result<AccountPage>;

    // Credential lifecycle
    async fn issue_password_reset_token(
        &self,
        email: &str,
        token: &str,
    ) -> Result<Account>;
    async fn redeem_password_reset_token(
        &self,
        token: &str,
        hashed_password: &str,
    ) -> Result<Account>;
    async fn redeem_confirmation_token(&self, token: &str) -> Result<Account>;

    // Schema management
    async fn migrate(&self) -> Result<()>;
    async fn truncate(&self) -> Result<()>;
    async fn close(&self);
}
