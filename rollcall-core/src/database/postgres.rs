use std::{path::Path, time::Duration};

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use tracing::{debug, info};

use crate::error::{AccountError, Result};

/// Pool sizing for the relational backend.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolSettings {
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }
}

/// Open a connection pool for `connection_string`.
pub async fn connect_pool(
    connection_string: &str,
    settings: PoolSettings,
) -> Result<PgPool> {
    let connect_options = build_connect_options(connection_string)?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .max_lifetime(Duration::from_secs(1800))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            AccountError::Backend(format!("Database connection failed: {}", e))
        })?;

    info!(
        "Database pool initialized with max_connections={}, min_connections={}",
        settings.max_connections, settings.min_connections
    );

    Ok(pool)
}

/// Parse the DSN and layer the standard `PG*` overrides on top.
fn build_connect_options(connection_string: &str) -> Result<PgConnectOptions> {
    let trimmed = connection_string.trim();

    let mut options = if trimmed.is_empty() {
        PgConnectOptions::new()
    } else {
        trimmed.parse::<PgConnectOptions>().map_err(|e| {
            AccountError::Backend(format!(
                "Invalid PostgreSQL connection string: {}",
                e
            ))
        })?
    };

    if let Ok(user) = std::env::var("PGUSER")
        && !user.is_empty()
    {
        options = options.username(&user);
    }

    if let Ok(password) = std::env::var("PGPASSWORD")
        && !password.is_empty()
    {
        options = options.password(&password);
    }

    let mut using_socket = false;
    if let Ok(host) = std::env::var("PGHOST")
        && !host.is_empty()
    {
        if host.starts_with('/') {
            options = options.socket(Path::new(&host));
            using_socket = true;
            debug!("Using PostgreSQL socket from PGHOST at {}", host);
        } else {
            options = options.host(&host);
            debug!("Using PostgreSQL host from PGHOST: {}", host);
        }
    }

    if let Ok(port) = std::env::var("PGPORT")
        && let Ok(port) = port.parse::<u16>()
    {
        options = options.port(port);
    }

    if using_socket && std::env::var("PGSSLMODE").is_err() {
        options = options.ssl_mode(PgSslMode::Disable);
    }

    Ok(options)
}
