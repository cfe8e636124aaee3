//! HYTT booking backend server.
//!
//! Serves the booking API over a primary database with an optional backup,
//! and keeps answering when neither can be reached.

use std::sync::Arc;

use clap::Parser;
use hytt_persistence::executor::{OfflineExecutor, PooledExecutor, QueryExecutor};
use hytt_persistence::failover::ProberHandle;
use hytt_persistence::seed::seed_notices;
use hytt_rest::{AppState, ServerConfig, create_app_with_state, init_logging};
use tracing::{error, info, warn};

/// Builds the executor from the database settings.
///
/// A configuration that cannot produce endpoints leaves the server running
/// without a database.
async fn create_executor(config: &ServerConfig) -> (Arc<dyn QueryExecutor>, Option<ProberHandle>) {
    let db_config = config.database_config();
    info!(
        engine = %db_config.engine,
        primary = %db_config.primary_endpoint().describe(db_config.engine),
        backup = db_config.backup_endpoint().is_some(),
        "Initializing database executor"
    );

    let executor = match PooledExecutor::from_config(&db_config) {
        Ok(executor) => executor,
        Err(e) => {
            error!(error = %e, "Database configuration unusable, starting without a database");
            return (Arc::new(OfflineExecutor::with_reason(e.to_string())), None);
        }
    };

    if config.init_schema
        && let Err(e) = executor.init_schema().await
    {
        warn!(error = %e, "Schema initialisation incomplete");
    }

    if config.seed_notices {
        let report = seed_notices(&executor).await;
        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            failed = report.failed,
            "Seeded default notices"
        );
    }

    let prober = executor.prober().start(db_config.probe_interval());
    (Arc::new(executor), Some(prober))
}

/// Starts the Axum HTTP server and waits for Ctrl-C.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        engine = %config.db_engine,
        "Starting HYTT server"
    );

    let (executor, mut prober) = create_executor(&config).await;
    let state = AppState::new(executor, config.clone());

    let mut notice_sweeper = state.notice_cache().start_sweeper(config.cache_check_period());
    let mut banner_sweeper = state.banner_cache().start_sweeper(config.cache_check_period());

    let app = create_app_with_state(state);
    let result = serve(app, &config).await;

    if let Some(prober) = prober.as_mut() {
        prober.stop().await;
    }
    notice_sweeper.stop().await;
    banner_sweeper.stop().await;
    info!("Server stopped");

    result
}

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("At least one database backend feature must be enabled");
