use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    database::{
        infrastructure::{
            column::{
                ScyllaColumnFamilies, ScyllaSettings, WideColumnAccountStore,
            },
            postgres::PostgresAccountStore,
        },
        ports::accounts::AccountStore,
        postgres::{PoolSettings, connect_pool},
    },
    error::Result,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendSelectionError {
    #[error(
        "no storage backend configured; set POSTGRESQL_URL or CASSANDRA_DB_NAME"
    )]
    NoneConfigured,
    #[error("POSTGRESQL_URL and CASSANDRA_DB_NAME are mutually exclusive")]
    BothConfigured,
}

/// Which account backend to open at startup.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Postgres { url: String, pool: PoolSettings },
    Cassandra(ScyllaSettings),
}

impl BackendConfig {
    /// Exactly one of the two backends must be configured. Blank values
    /// count as unset.
    pub fn select(
        postgres_url: Option<String>,
        cassandra: Option<ScyllaSettings>,
        pool: PoolSettings,
    ) -> std::result::Result<Self, BackendSelectionError> {
        let postgres_url = postgres_url.filter(|url| !url.trim().is_empty());

        match (postgres_url, cassandra) {
            (Some(url), None) => Ok(BackendConfig::Postgres { url, pool }),
            (None, Some(settings)) => Ok(BackendConfig::Cassandra(settings)),
            (Some(_), Some(_)) => Err(BackendSelectionError::BothConfigured),
            (None, None) => Err(BackendSelectionError::NoneConfigured),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Postgres { .. } => "postgres",
            BackendConfig::Cassandra(_) => "cassandra",
        }
    }

    /// Open the selected backend. The schema is not touched; call
    /// [`AccountStore::migrate`] separately.
    pub async fn connect(&self) -> Result<Arc<dyn AccountStore>> {
        let store: Arc<dyn AccountStore> = match self {
            BackendConfig::Postgres { url, pool } => {
                let pool = connect_pool(url, *pool).await?;
                Arc::new(PostgresAccountStore::new(pool))
            }
            BackendConfig::Cassandra(settings) => {
                let tables =
                    ScyllaColumnFamilies::connect(settings.clone()).await?;
                Arc::new(WideColumnAccountStore::new(tables))
            }
        };

        info!("Using {} account backend", store.backend_name());
        Ok(store)
    }
}
