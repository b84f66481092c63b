//! Core data model definitions shared across Rollcall crates.
#![allow(missing_docs)]

pub mod account;
pub mod api;
pub mod error;
pub mod events;
pub mod ids;
pub mod image;

// Intentionally curated re-exports for downstream consumers.
pub use account::{
    Account, AccountDetails, AccountImage, AccountInput, NewAccount,
    normalize_email,
};
pub use error::ValidationError;
pub use events::{AccountEvent, AccountEventKind};
pub use ids::AccountId;
pub use image::{ImageOperation, ImageUpload};
