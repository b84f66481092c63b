//! Repository ports (interfaces). Implementations live under
//! `database::infrastructure`.

pub mod accounts;

pub use accounts::AccountStore;
