use crate::account::AccountDetails;

/// Kind of mutation an [`AccountEvent`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AccountEventKind {
    Created,
    Updated,
    Deleted,
}

impl AccountEventKind {
    /// Pub/sub topic the event is published on.
    pub const fn topic(self) -> &'static str {
        match self {
            AccountEventKind::Created => "account_service.created",
            AccountEventKind::Updated => "account_service.updated",
            AccountEventKind::Deleted => "account_service.deleted",
        }
    }
}

/// Notification emitted after a mutation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountEvent {
    pub kind: AccountEventKind,
    pub account: AccountDetails,
}

impl AccountEvent {
    pub fn created(account: AccountDetails) -> Self {
        Self {
            kind: AccountEventKind::Created,
            account,
        }
    }

    pub fn updated(account: AccountDetails) -> Self {
        Self {
            kind: AccountEventKind::Updated,
            account,
        }
    }

    pub fn deleted(account: AccountDetails) -> Self {
        Self {
            kind: AccountEventKind::Deleted,
            account,
        }
    }

    pub fn topic(&self) -> &'static str {
        self.kind.topic()
    }
}
