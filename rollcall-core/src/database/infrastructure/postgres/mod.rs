pub mod accounts;

pub use accounts::PostgresAccountStore;
