//! Account records and their validation rules.
//!
//! An [`Account`] is the persisted identity record. Secrets
//! (`hashed_password` and the two lifecycle tokens) never leave the
//! service: they are skipped by serde and redacted from `Debug` output.
//! Callers only ever see the [`AccountDetails`] projection.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};

use crate::{error::ValidationError, ids::AccountId};

/// Normalized form of an email address used for uniqueness checks.
///
/// Comparison is case-insensitive and ignores surrounding whitespace;
/// the caller's original casing is kept on the record for display.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_fields(name: &str, email: &str) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if name.trim().is_empty() {
        missing.push("name");
    }
    if email.trim().is_empty() {
        missing.push("email");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(missing))
    }
}

/// Reference to an image held by the external image service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountImage {
    /// Variant produced by the image service (e.g. `thumbnail`, `large`)
    pub variant: String,
    /// Public location of the stored image
    pub url: String,
    /// Key the image service uses to address (and delete) the image
    pub filename: String,
}

/// Persisted account record.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub hashed_password: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub confirmation_token: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub password_reset_token: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub images: Vec<AccountImage>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Reject records without a name or email.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.email)
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation_token.is_none()
    }

    pub fn details(&self) -> AccountDetails {
        AccountDetails::from(self)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("hashed_password", &"<redacted>")
            .field(
                "confirmation_token",
                &self.confirmation_token.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "password_reset_token",
                &self.password_reset_token.as_ref().map(|_| "<redacted>"),
            )
            .field("images", &self.images)
            .field("metadata", &self.metadata)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Account shape handed to a backend's `create`.
///
/// The backend fills in the identifier and creation timestamp.
#[derive(Clone, Default)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub confirmation_token: Option<String>,
    pub images: Vec<AccountImage>,
    pub metadata: HashMap<String, String>,
}

impl NewAccount {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.email)
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    /// Bind the storage-assigned identity, producing the full record.
    pub fn into_account(
        self,
        id: AccountId,
        created_at: DateTime<Utc>,
    ) -> Account {
        Account {
            id,
            name: self.name,
            email: self.email,
            hashed_password: self.hashed_password,
            confirmation_token: self.confirmation_token,
            password_reset_token: None,
            images: self.images,
            metadata: self.metadata,
            created_at,
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("images", &self.images)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied, mutable portion of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountInput {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub email: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: HashMap<String, String>,
}

impl AccountInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.email)
    }
}

/// Public projection of an account returned over the API.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountDetails {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub images: Vec<AccountImage>,
    pub metadata: HashMap<String, String>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountDetails {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            images: account.images.clone(),
            metadata: account.metadata.clone(),
            confirmed: account.is_confirmed(),
            created_at: account.created_at,
        }
    }
}

impl From<Account> for AccountDetails {
    fn from(account: Account) -> Self {
        let confirmed = account.is_confirmed();
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            images: account.images,
            metadata: account.metadata,
            confirmed,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, email: &str) -> Account {
        NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            hashed_password: "$argon2id$stub".to_string(),
            ..Default::default()
        }
        .into_account(AccountId::generate(), Utc::now())
    }

    #[test]
    fn valid_account() {
        assert!(account("Alex", "email@google.com").validate().is_ok());
    }

    #[test]
    fn reports_every_missing_field() {
        let err = account("", "").validate().unwrap_err();
        assert_eq!(err.fields.len(), 2);
        assert!(err.contains("name"));
        assert!(err.contains("email"));
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        let err = account("   ", "a@x.com").validate().unwrap_err();
        assert_eq!(err.fields, vec!["name"]);
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
        assert_eq!(
            account("A", "Mixed@Case.IO").normalized_email(),
            "mixed@case.io"
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut acc = account("Alex", "a@x.com");
        acc.password_reset_token = Some("reset-me".to_string());
        let rendered = format!("{acc:?}");
        assert!(!rendered.contains("$argon2id$stub"));
        assert!(!rendered.contains("reset-me"));
    }

    #[test]
    fn details_track_confirmation() {
        let mut acc = account("Alex", "a@x.com");
        acc.confirmation_token = Some("pending".to_string());
        assert!(!acc.details().confirmed);
        acc.confirmation_token = None;
        assert!(acc.details().confirmed);
    }
}
