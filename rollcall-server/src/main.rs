//! # Rollcall Server
//!
//! Account directory exposing create, lookup, update, delete, listing and
//! credential flows over JSON.
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - PostgreSQL or Cassandra/ScyllaDB for persistent storage (exactly one)
//! - An external HTTP image service for account pictures (optional)
//! - Redis pub/sub for account change events (optional)

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use rollcall_core::database::AccountStore;
use rollcall_server::{
    create_app,
    infra::{
        cli::{Cli, Command, DbCommand, ServeArgs},
        config::Config,
        startup::wire_app_state,
    },
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_LOG_FILTER: &str =
    "rollcall_server=info,rollcall_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_loaded {
        info!("loaded .env file");
    }

    if let Some(command) = cli.command {
        match command {
            Command::Db(DbCommand::Migrate) => {
                run_db_migrate(&cli.serve).await?;
                return Ok(());
            }
            Command::Db(DbCommand::Truncate { yes }) => {
                run_db_truncate(&cli.serve, yes).await?;
                return Ok(());
            }
        }
    }

    run_server(cli.serve).await
}

async fn open_store(
    config: &Config,
) -> anyhow::Result<Arc<dyn AccountStore>> {
    let backend = config.backend.name();
    config.backend.connect().await.with_context(|| {
        format!("failed to connect to the {backend} backend")
    })
}

async fn run_db_migrate(args: &ServeArgs) -> anyhow::Result<()> {
    let config = Config::from_args(args)?;
    let store = open_store(&config).await?;
    let outcome = store.migrate().await.context("schema migration failed");
    store.close().await;
    outcome?;
    info!("{} schema is up to date", config.backend.name());
    Ok(())
}

async fn run_db_truncate(
    args: &ServeArgs,
    confirmed: bool,
) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("refusing to delete every account without --yes");
    }

    let config = Config::from_args(args)?;
    let store = open_store(&config).await?;
    let outcome = store.truncate().await.context("truncate failed");
    store.close().await;
    outcome?;
    warn!("all accounts deleted from the {} backend", config.backend.name());
    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = Config::from_args(&args)?;
    let addr = config.listen_addr()?;

    let store = open_store(&config).await?;
    store
        .migrate()
        .await
        .context("failed to apply account schema at startup")?;

    let state = wire_app_state(&config, Arc::clone(&store)).await?;
    let router = create_app(state);

    info!(
        "Starting Rollcall account server on {}:{}",
        config.server_host, config.server_port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let make_service =
        router.into_make_service_with_connect_info::<SocketAddr>();
    let served = axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    info!("account server stopped");
    served.context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
