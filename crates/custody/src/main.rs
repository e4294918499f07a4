//! `custody-svc`: equipment custody HTTP service.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP export).
//! 3. Build the field codec from `ENCRYPTION_KEY`.
//! 4. Open the record store (data file or in-memory).
//! 5. Open every stored sealed value with the configured key.
//! 6. Build the Axum router and serve until Ctrl-C.

mod config;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use config::Config;
use server::state::AppState;
use store::{CustodyRepository, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otlp_endpoint(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "custody-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field codec
    // -----------------------------------------------------------------------
    let codec = Arc::new(cfg.codec().context("ENCRYPTION_KEY is invalid")?);
    info!(key_fingerprint = %codec.fingerprint(), "field codec ready");

    // -----------------------------------------------------------------------
    // 4. Record store
    // -----------------------------------------------------------------------
    let store = match &cfg.data_path {
        Some(path) => RecordStore::open(path.clone())
            .await
            .with_context(|| format!("failed to open data file {}", path.display()))?,
        None => {
            warn!("DATA_PATH not set; records are kept in memory and lost on exit");
            RecordStore::in_memory()
        }
    };
    let repo = CustodyRepository::new(store, codec);

    // -----------------------------------------------------------------------
    // 5. Integrity check
    // -----------------------------------------------------------------------
    match repo.verify_all() {
        Ok(count) => info!(sealed_values = count, "stored values verified"),
        Err(e) => {
            error!(error = %e, "stored data cannot be opened with the configured key");
            telemetry::shutdown();
            return Err(e).context("integrity check failed; refusing to serve");
        }
    }

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(repo));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("custody-svc stopped");
    telemetry::shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
