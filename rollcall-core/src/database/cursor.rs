//! Opaque page tokens for bounded listing.
//!
//! A page token resumes a listing strictly after the last record of the
//! previous page. Keyset backends encode the last identifier returned;
//! offset backends encode how many records have been consumed. Either way
//! the token is base64url so callers treat it as an opaque string.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rollcall_model::{Account, AccountId};

use crate::error::{AccountError, Result};

/// Page size used when the caller asks for zero.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: u32 = 1000;

const AFTER_PREFIX: &str = "after:";
const OFFSET_PREFIX: &str = "offset:";

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn effective_page_size(requested: u32) -> u32 {
    match requested {
        0 => DEFAULT_PAGE_SIZE,
        n => n.min(MAX_PAGE_SIZE),
    }
}

/// Decoded position within a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    Start,
    After(AccountId),
    Offset(u64),
}

impl PageCursor {
    /// Parse a caller-supplied token; the empty string is the first page.
    pub fn decode(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(PageCursor::Start);
        }

        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| AccountError::invalid("page_token"))?;
        let raw = String::from_utf8(raw)
            .map_err(|_| AccountError::invalid("page_token"))?;

        if let Some(id) = raw.strip_prefix(AFTER_PREFIX) {
            return id
                .parse::<AccountId>()
                .map(PageCursor::After)
                .map_err(|_| AccountError::invalid("page_token"));
        }

        if let Some(offset) = raw.strip_prefix(OFFSET_PREFIX) {
            return offset
                .parse::<u64>()
                .map(PageCursor::Offset)
                .map_err(|_| AccountError::invalid("page_token"));
        }

        Err(AccountError::invalid("page_token"))
    }

    /// Render as an opaque token; [`PageCursor::Start`] renders empty.
    pub fn encode(&self) -> String {
        match self {
            PageCursor::Start => String::new(),
            PageCursor::After(id) => {
                URL_SAFE_NO_PAD.encode(format!("{AFTER_PREFIX}{id}"))
            }
            PageCursor::Offset(offset) => {
                URL_SAFE_NO_PAD.encode(format!("{OFFSET_PREFIX}{offset}"))
            }
        }
    }

    /// Keyset position for backends that continue after the last id.
    pub fn keyset(&self) -> Result<Option<AccountId>> {
        match self {
            PageCursor::Start => Ok(None),
            PageCursor::After(id) => Ok(Some(*id)),
            PageCursor::Offset(_) => Err(AccountError::invalid("page_token")),
        }
    }

    /// Offset position for backends that page by row count.
    pub fn offset(&self) -> Result<u64> {
        match self {
            PageCursor::Start => Ok(0),
            PageCursor::Offset(offset) => Ok(*offset),
            PageCursor::After(_) => Err(AccountError::invalid("page_token")),
        }
    }
}

/// One page of a listing plus the token for the next one.
#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    /// Empty when this page was the last one
    pub next_cursor: String,
}

impl AccountPage {
    /// A full page may be followed by more records, so it carries a
    /// continuation from its last id. A short page ends the listing.
    pub fn keyset(accounts: Vec<Account>, page_size: u32) -> Self {
        let next_cursor = match accounts.last() {
            Some(last) if accounts.len() == page_size as usize => {
                PageCursor::After(last.id).encode()
            }
            _ => String::new(),
        };
        Self {
            accounts,
            next_cursor,
        }
    }

    pub fn offset(accounts: Vec<Account>, page_size: u32, offset: u64) -> Self {
        let full = accounts.len() == page_size as usize;
        let next_cursor = if !accounts.is_empty() && full {
            PageCursor::Offset(offset + accounts.len() as u64).encode()
        } else {
            String::new()
        };
        Self {
            accounts,
            next_cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_empty()
    }
}
