//! # Rollcall Core
//!
//! Storage, credential and orchestration layer of the Rollcall account
//! directory.
//!
//! ## Overview
//!
//! - **Storage**: one [`database::AccountStore`] contract with a PostgreSQL
//!   implementation and a wide-column implementation (Cassandra/ScyllaDB or
//!   in-process tables), chosen at startup through
//!   [`database::BackendConfig`]
//! - **Credentials**: Argon2id password hashing and single-use token
//!   issuance in [`credentials`]
//! - **Pagination**: opaque page tokens in [`database::cursor`]
//! - **Orchestration**: [`application::AccountService`] composes validation,
//!   credentials, the external image service and the store, compensating
//!   image writes when persistence fails
//!
//! ## Feature Flags
//!
//! - `mocks`: exposes `MockImageStore` for downstream test suites

pub mod application;
pub mod credentials;
pub mod database;
pub mod error;
pub mod infra;

pub use application::AccountService;
pub use credentials::{CredentialError, CredentialManager};
pub use error::{AccountError, Result};

/// Embedded PostgreSQL migrations for the relational backend.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
