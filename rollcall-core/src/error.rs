use rollcall_model::ValidationError;
use thiserror::Error;

/// Failure kinds surfaced by the account directory.
///
/// Each variant maps onto exactly one status at the RPC boundary, so
/// driver-level detail stays inside the `Backend`/`Internal` messages and
/// never needs to be parsed by callers.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("email already exists")]
    EmailExists,

    #[error("account not found")]
    NotFound,

    #[error("no password given")]
    NoPasswordGiven,

    #[error("authentication failed")]
    AuthFailed,

    #[error("image service error: {0}")]
    ExternalService(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AccountError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AccountError::NotFound)
    }

    pub(crate) fn invalid(field: &'static str) -> Self {
        AccountError::Validation(ValidationError::field(field))
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;
