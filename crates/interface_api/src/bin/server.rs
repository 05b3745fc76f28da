//! Clinic Ledger - API Server Binary
//!
//! This binary starts the HTTP API server for the clinic ledger.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin clinic-ledger-api
//!
//! # Run against a throwaway in-memory store
//! LEDGER_STORAGE=memory cargo run --bin clinic-ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_HOST` - Server host (default: 0.0.0.0)
//! * `LEDGER_PORT` - Server port (default: 8080)
//! * `LEDGER_STORAGE` - `postgres` or `memory` (default: postgres)
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string
//! * `LEDGER_LOG_LEVEL` - Log filter, e.g. `info` or `domain_ledger=debug` (default: info)
//! * `LEDGER_LOG_JSON` - `true` for JSON log lines
//! * `LEDGER_RECONCILIATION_INTERVAL_SECS` - 0 disables background reconciliation
//! * `LEDGER_CONFIG_FILE` - Optional TOML file with the same keys plus a `[ledger]` table

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::{InMemoryLedgerStore, LedgerEngine, LedgerStore};
use infra_db::{create_pool, run_migrations, PostgresLedgerAdapter};
use interface_api::background::spawn_reconciliation;
use interface_api::config::{ApiConfig, StorageBackend};
use interface_api::{create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, opens the ledger store and
/// starts the HTTP server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded
/// - Database connection or migration fails
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = ?config.storage,
        "Starting clinic ledger API server"
    );

    let state = build_state(&config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciliation = config
        .reconciliation_interval()
        .map(|period| spawn_reconciliation(state.engine.clone(), period, shutdown_rx));

    let app = create_router(state);
    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send_replace(true);
    if let Some(task) = reconciliation {
        task.await?;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wires the ledger engine to the configured store
async fn build_state(config: &ApiConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database()).await?;
            run_migrations(&pool).await?;
            let adapter = Arc::new(PostgresLedgerAdapter::new(pool));
            let store: Arc<dyn LedgerStore> = adapter.clone();
            let engine = LedgerEngine::new(store, config.ledger.clone())?;
            Ok(AppState::new(engine).with_health_check(adapter))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; postings are lost on restart");
            let engine = LedgerEngine::new(Arc::new(InMemoryLedgerStore::new()), config.ledger.clone())?;
            Ok(AppState::new(engine))
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
