//! Karma economy server.
//!
//! Serves the wallet, valuation and trade API over HTTP, backed by
//! PostgreSQL or an in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use karma_core::db::{Database, InMemoryStore, KarmaStore};
use karma_server::config::{ServerConfig, StoreBackend};
use karma_server::{api, logging, metrics};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run the karma points economy server

USAGE:
  karma_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --store      BACKEND     postgres or memory          [default: env KARMA_STORE or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  KARMA_TRADING_MODE       karma or cash
  KARMA_DEMAND             fixed, random or market
  KARMA_OPERATOR_ACCOUNTS  Comma separated account ids allowed to resolve disputes
  METRICS_BIND             Prometheus scrape address
  RUST_LOG                 Log filter (e.g., info,karma_core=debug)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    store: Option<StoreBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        store: pargs.opt_value_from_str("--store")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.store)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported at http://{}/metrics", metrics_bind);
    }

    let (store, database): (Arc<dyn KarmaStore>, Option<Database>) = match config.store {
        StoreBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.apply_schema()
                .await
                .context("Failed to apply karma schema")?;
            info!("Database connected successfully");
            (Arc::new(db.store()), Some(db))
        }
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store, nothing will be persisted");
            (Arc::new(InMemoryStore::new()), None)
        }
    };

    info!(
        "Karma trading mode {:?}, demand {:?}, {} operator(s)",
        config.karma.trading_mode,
        config.karma.demand,
        config.karma.operators.len()
    );

    let state = api::AppState::new(store, config.karma);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
    }
}
