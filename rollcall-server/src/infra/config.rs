use std::{net::SocketAddr, time::Duration};

use rollcall_core::database::{
    BackendConfig, BackendSelectionError, PoolSettings, ScyllaSettings,
    infrastructure::column::scylla::parse_consistency,
};
use thiserror::Error;

use crate::infra::cli::ServeArgs;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Backend(#[from] BackendSelectionError),
    #[error("invalid Cassandra settings: {0}")]
    Cassandra(String),
    #[error("invalid listen address {0}")]
    ListenAddress(String),
}

/// Runtime configuration resolved from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub backend: BackendConfig,
    pub image_service_url: Option<String>,
    pub image_service_timeout: Duration,
    pub redis_url: Option<String>,
    pub password_pepper: String,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    pub fn from_args(args: &ServeArgs) -> Result<Self, ConfigError> {
        let cassandra = match non_blank(&args.cassandra_db_name) {
            Some(keyspace) => {
                let consistency = parse_consistency(&args.cassandra_consistency)
                    .map_err(|e| ConfigError::Cassandra(e.to_string()))?;
                let settings =
                    ScyllaSettings::new(keyspace, &args.cassandra_db_hosts)
                        .map_err(|e| ConfigError::Cassandra(e.to_string()))?
                        .with_consistency(consistency)
                        .with_replication_factor(
                            args.cassandra_replication_factor,
                        );
                Some(settings)
            }
            None => None,
        };

        let pool = PoolSettings::default()
            .with_max_connections(args.db_max_connections);
        let backend = BackendConfig::select(
            non_blank(&args.postgresql_url),
            cassandra,
            pool,
        )?;

        Ok(Self {
            server_host: args.host.clone(),
            server_port: args.port,
            backend,
            image_service_url: non_blank(&args.image_service_url),
            image_service_timeout: args.image_service_timeout,
            redis_url: non_blank(&args.redis_url),
            password_pepper: args.password_pepper.clone(),
            argon2_memory_kib: args.argon2_memory_kib,
            argon2_iterations: args.argon2_iterations,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server_host, self.server_port);
        addr.parse().map_err(|_| ConfigError::ListenAddress(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            host: "127.0.0.1".into(),
            port: 8000,
            postgresql_url: None,
            db_max_connections: 10,
            cassandra_db_name: None,
            cassandra_db_hosts: "127.0.0.1:9042".into(),
            cassandra_consistency: "local_quorum".into(),
            cassandra_replication_factor: 1,
            image_service_url: None,
            image_service_timeout: Duration::from_secs(1),
            redis_url: None,
            password_pepper: String::new(),
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
        }
    }

    #[test]
    fn selects_exactly_one_backend() {
        let mut postgres = args();
        postgres.postgresql_url = Some("postgres://localhost/accounts".into());
        let selected = Config::from_args(&postgres).unwrap();
        assert_eq!(selected.backend.name(), "postgres");

        let mut cassandra = args();
        cassandra.cassandra_db_name = Some("accounts".into());
        let selected = Config::from_args(&cassandra).unwrap();
        assert_eq!(selected.backend.name(), "cassandra");

        assert!(matches!(
            Config::from_args(&args()),
            Err(ConfigError::Backend(BackendSelectionError::NoneConfigured))
        ));

        let mut both = postgres.clone();
        both.cassandra_db_name = Some("accounts".into());
        assert!(matches!(
            Config::from_args(&both),
            Err(ConfigError::Backend(BackendSelectionError::BothConfigured))
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut blank = args();
        blank.cassandra_db_name = Some("   ".into());
        blank.postgresql_url = Some("postgres://localhost/accounts".into());
        blank.image_service_url = Some(String::new());
        let config = Config::from_args(&blank).unwrap();
        assert_eq!(config.backend.name(), "postgres");
        assert!(config.image_service_url.is_none());
    }

    #[test]
    fn rejects_bad_cassandra_consistency() {
        let mut bad = args();
        bad.cassandra_db_name = Some("accounts".into());
        bad.cassandra_consistency = "mostly".into();
        assert!(matches!(
            Config::from_args(&bad),
            Err(ConfigError::Cassandra(_))
        ));
    }

    #[test]
    fn listen_address() {
        let mut postgres = args();
        postgres.postgresql_url = Some("postgres://localhost/accounts".into());
        let config = Config::from_args(&postgres).unwrap();
        assert_eq!(config.listen_addr().unwrap().port(), 8000);
    }
}
