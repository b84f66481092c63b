pub mod backend;
pub mod cursor;
pub mod infrastructure;
pub mod ports;
pub mod postgres;

pub use backend::{BackendConfig, BackendSelectionError};
pub use cursor::{AccountPage, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageCursor};
pub use infrastructure::column::{
    ColumnFamilies, MemoryColumnFamilies, ScyllaColumnFamilies, ScyllaSettings,
    TableOp, WideColumnAccountStore,
};
pub use infrastructure::postgres::PostgresAccountStore;
pub use ports::AccountStore;
pub use postgres::PoolSettings;
