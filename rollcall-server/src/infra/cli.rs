use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "Account directory with PostgreSQL and Cassandra backends")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create or upgrade the account schema and exit
    Migrate,
    /// Delete every account and exit
    Truncate {
        /// Required confirmation; nothing is deleted without it
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Server host
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// PostgreSQL connection string; selects the relational backend
    #[arg(long, env = "POSTGRESQL_URL", hide_env_values = true)]
    pub postgresql_url: Option<String>,

    /// Maximum PostgreSQL pool size
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Cassandra keyspace; selects the wide-column backend
    #[arg(long, env = "CASSANDRA_DB_NAME")]
    pub cassandra_db_name: Option<String>,

    /// Comma-separated Cassandra contact points
    #[arg(long, env = "CASSANDRA_DB_HOSTS", default_value = "127.0.0.1:9042")]
    pub cassandra_db_hosts: String,

    /// Consistency level for every Cassandra statement
    #[arg(long, env = "CASSANDRA_CONSISTENCY", default_value = "local_quorum")]
    pub cassandra_consistency: String,

    /// Replication factor used when `db migrate` creates the keyspace
    #[arg(long, env = "CASSANDRA_REPLICATION_FACTOR", default_value_t = 1)]
    pub cassandra_replication_factor: u32,

    /// Base URL of the image service; image payloads are rejected without it
    #[arg(long, env = "IMAGE_SERVICE_URL")]
    pub image_service_url: Option<String>,

    /// Connect and response timeout for image service calls
    #[arg(
        long,
        env = "IMAGE_SERVICE_TIMEOUT",
        default_value = "1s",
        value_parser = humantime::parse_duration
    )]
    pub image_service_timeout: Duration,

    /// Redis URL for publishing account events
    #[arg(long, env = "REDIS_URL", hide_env_values = true)]
    pub redis_url: Option<String>,

    /// Secret appended to passwords before hashing
    #[arg(
        long,
        env = "PASSWORD_PEPPER",
        default_value = "",
        hide_env_values = true
    )]
    pub password_pepper: String,

    /// Argon2id memory cost in KiB
    #[arg(long, env = "ARGON2_MEMORY_KIB", default_value_t = 19 * 1024)]
    pub argon2_memory_kib: u32,

    /// Argon2id iteration count
    #[arg(long, env = "ARGON2_ITERATIONS", default_value_t = 2)]
    pub argon2_iterations: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from([
            "rollcall-server",
            "db",
            "truncate",
            "--yes",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Db(DbCommand::Truncate { yes: true }))
        ));

        let cli =
            Cli::try_parse_from(["rollcall-server", "db", "migrate"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Db(DbCommand::Migrate))));
    }

    #[test]
    fn parses_textual_timeouts() {
        let cli = Cli::try_parse_from([
            "rollcall-server",
            "--image-service-timeout",
            "250ms",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(cli.serve.image_service_timeout, Duration::from_millis(250));
        assert_eq!(cli.serve.port, 9000);
    }
}
