use std::{fmt, sync::Arc};

use rollcall_model::{
    Account, AccountEvent, AccountId, AccountImage, AccountInput, ImageUpload,
    NewAccount, normalize_email,
    api::{CreateAccountRequest, UpdateAccountRequest},
};
use tracing::{info, warn};

use crate::{
    credentials::{CredentialError, CredentialManager},
    database::{cursor::AccountPage, ports::accounts::AccountStore},
    error::{AccountError, Result},
    infra::{
        events::{AccountEventPublisher, NullEventPublisher},
        image_store::ImageStore,
    },
};

/// Orchestrates account mutations across the store, the credential
/// manager and the image service.
///
/// Image-service calls happen before the store confirms the write. When the
/// store then fails, images stored by the same call are deleted again on a
/// best-effort basis; failures of that cleanup are logged and the store
/// error is returned.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    credentials: Arc<CredentialManager>,
    images: Option<Arc<dyn ImageStore>>,
    events: Arc<dyn AccountEventPublisher>,
}

impl fmt::Debug for AccountService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountService")
            .field("backend", &self.store.backend_name())
            .field("image_store", &self.images.is_some())
            .finish()
    }
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        credentials: Arc<CredentialManager>,
    ) -> Self {
        Self {
            store,
            credentials,
            images: None,
            events: Arc::new(NullEventPublisher),
        }
    }

    pub fn with_image_store(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_event_publisher(
        mut self,
        events: Arc<dyn AccountEventPublisher>,
    ) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub async fn create(
        &self,
        request: CreateAccountRequest,
    ) -> Result<Account> {
        let input = request
            .account
            .ok_or_else(|| AccountError::invalid("account"))?;
        input.validate()?;

        match self.store.read_by_email(&input.email).await {
            Ok(_) => return Err(AccountError::EmailExists),
            Err(AccountError::NotFound) => {}
            Err(err) => return Err(err),
        }

        if request.password.is_empty() {
            return Err(AccountError::NoPasswordGiven);
        }

        let hashed_password = self.hash_password(request.password).await?;
        let confirmation_token =
            self.credentials.issue_token(CredentialManager::TOKEN_LENGTH);

        let images = match &request.image {
            Some(upload) => self.store_images(upload).await?,
            None => Vec::new(),
        };

        let new_account = NewAccount {
            name: input.name,
            email: input.email,
            hashed_password,
            confirmation_token: Some(confirmation_token),
            images,
            metadata: input.metadata,
        };
        let stored_images = new_account.images.clone();

        let account = match self.store.create(new_account).await {
            Ok(account) => account,
            Err(err) => {
                self.release_images(&stored_images, "account create failed")
                    .await;
                return Err(err);
            }
        };

        info!("Account {} created", account.id);
        self.publish(AccountEvent::created(account.details())).await;
        Ok(account)
    }

    /// Apply caller input onto the stored record.
    ///
    /// Only profile fields are written; the store keeps id, creation time,
    /// credentials and tokens as they are at write time. Without an
    /// image payload the existing images are kept. With one, the new images
    /// are stored first; the old ones are deleted only after the record
    /// update succeeds, and the new ones are deleted if it fails.
    pub async fn update(
        &self,
        id: AccountId,
        request: UpdateAccountRequest,
    ) -> Result<Account> {
        let input: AccountInput = request
            .account
            .ok_or_else(|| AccountError::invalid("account"))?;
        input.validate()?;

        let current = self.store.read_by_id(id).await?;

        if normalize_email(&input.email) != current.normalized_email() {
            match self.store.read_by_email(&input.email).await {
                Ok(other) if other.id != id => {
                    return Err(AccountError::EmailExists);
                }
                Ok(_) | Err(AccountError::NotFound) => {}
                Err(err) => return Err(err),
            }
        }

        let mut merged = current.clone();
        merged.name = input.name;
        merged.email = input.email;
        merged.metadata = input.metadata;

        let new_images = match &request.image {
            Some(upload) => Some(self.store_images(upload).await?),
            None => None,
        };
        if let Some(images) = &new_images {
            merged.images = images.clone();
        }

        let updated = match self.store.update(&merged).await {
            Ok(updated) => updated,
            Err(err) => {
                if let Some(images) = &new_images {
                    self.release_images(images, "account update failed").await;
                }
                return Err(err);
            }
        };

        if new_images.is_some() {
            self.release_images(&current.images, "images replaced").await;
        }

        info!("Account {} updated", updated.id);
        self.publish(AccountEvent::updated(updated.details())).await;
        Ok(updated)
    }

    /// Release the account's images, then remove the record. The first
    /// image that cannot be deleted aborts the call with the record intact.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        let current = self.store.read_by_id(id).await?;

        if !current.images.is_empty() {
            let images = self.image_store()?;
            for image in &current.images {
                images
                    .delete(image)
                    .await
                    .map_err(|e| AccountError::ExternalService(e.to_string()))?;
            }
        }

        self.store.delete(id).await?;

        info!("Account {} deleted", id);
        self.publish(AccountEvent::deleted(current.details())).await;
        Ok(())
    }

    pub async fn get_by_id(&self, id: AccountId) -> Result<Account> {
        self.store.read_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Account> {
        self.store.read_by_email(email).await
    }

    pub async fn list(
        &self,
        page_size: u32,
        page_token: &str,
    ) -> Result<AccountPage> {
        self.store.list(page_size, page_token).await
    }

    pub async fn authenticate_by_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account> {
        let account = self.store.read_by_email(email).await?;

        let credentials = Arc::clone(&self.credentials);
        let digest = account.hashed_password.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || {
            credentials.verify(&digest, &password)
        })
        .await
        .map_err(|e| {
            AccountError::Internal(format!("verify task failed: {}", e))
        })?;

        match verified {
            Ok(()) => Ok(account),
            Err(CredentialError::Mismatch) => Err(AccountError::AuthFailed),
            Err(err) => {
                warn!(
                    "Stored digest for account {} is unusable: {}",
                    account.id, err
                );
                Err(AccountError::AuthFailed)
            }
        }
    }

    /// Issue and persist a password reset token for the account behind
    /// `email`, returning the token for out-of-band delivery.
    pub async fn generate_password_token(
        &self,
        email: &str,
    ) -> Result<String> {
        let token =
            self.credentials.issue_token(CredentialManager::TOKEN_LENGTH);
        let account =
            self.store.issue_password_reset_token(email, &token).await?;
        info!("Password reset token issued for account {}", account.id);
        Ok(token)
    }

    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<Account> {
        if password.is_empty() {
            return Err(AccountError::NoPasswordGiven);
        }

        let hashed_password = self.hash_password(password.to_string()).await?;
        let account = self
            .store
            .redeem_password_reset_token(token, &hashed_password)
            .await?;

        self.publish(AccountEvent::updated(account.details())).await;
        Ok(account)
    }

    pub async fn confirm_account(&self, token: &str) -> Result<Account> {
        let account = self.store.redeem_confirmation_token(token).await?;
        self.publish(AccountEvent::updated(account.details())).await;
        Ok(account)
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let credentials = Arc::clone(&self.credentials);
        let hashed = tokio::task::spawn_blocking(move || {
            credentials.hash_password(&password)
        })
        .await
        .map_err(|e| {
            AccountError::Internal(format!("hash task failed: {}", e))
        })?;

        hashed.map_err(|err| match err {
            CredentialError::EmptyPassword => AccountError::NoPasswordGiven,
            other => AccountError::Internal(other.to_string()),
        })
    }

    fn image_store(&self) -> Result<&Arc<dyn ImageStore>> {
        self.images.as_ref().ok_or_else(|| {
            AccountError::ExternalService(
                "image service not configured".into(),
            )
        })
    }

    async fn store_images(
        &self,
        upload: &ImageUpload,
    ) -> Result<Vec<AccountImage>> {
        self.image_store()?
            .store(upload)
            .await
            .map_err(|e| AccountError::ExternalService(e.to_string()))
    }

    async fn release_images(&self, images: &[AccountImage], reason: &str) {
        let Some(store) = self.images.as_ref() else {
            return;
        };

        for image in images {
            if let Err(err) = store.delete(image).await {
                warn!(
                    "Failed to delete image {} ({}): {}",
                    image.filename, reason, err
                );
            }
        }
    }

    async fn publish(&self, event: AccountEvent) {
        if let Err(err) = self.events.publish(&event).await {
            warn!(
                "Failed to publish {} for {}: {}",
                event.topic(),
                event.account.id,
                err
            );
        }
    }
}
