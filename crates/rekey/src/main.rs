//! `rekey`: offline key rotation for the custody data file.
//!
//! The custody service must be stopped while this runs.
//!
//! Sequence:
//! 1. Load and validate [`config::Config`] from environment variables.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Open every stored serial number with the old key, re-seal it with the
//!    new key, back up the file, and replace it.

mod config;
mod migrate;
mod telemetry;

use anyhow::{Context, Result};
use common::FieldCodec;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: rekey configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 3. Migration
    // -----------------------------------------------------------------------
    let old = FieldCodec::initialize(&cfg.old_encryption_key)
        .context("OLD_ENCRYPTION_KEY is invalid")?;
    let new = FieldCodec::initialize(&cfg.new_encryption_key)
        .context("NEW_ENCRYPTION_KEY is invalid")?;
    info!(
        path = %cfg.data_path.display(),
        dry_run = cfg.dry_run,
        "rekey starting"
    );

    match migrate::run(&cfg.data_path, &old, &new, cfg.dry_run).await {
        Ok(report) => {
            info!(
                kits = report.kits,
                items = report.items,
                resealed = report.resealed,
                "rekey finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "rekey aborted; data file unchanged");
            Err(e.into())
        }
    }
}
