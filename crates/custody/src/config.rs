//! Configuration loading and validation for the custody service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.
//! In particular the service never starts without a usable `ENCRYPTION_KEY`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use common::crypto::{ConfigError, EncryptionKey};
use common::FieldCodec;
use serde::Deserialize;

/// Validated custody service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64 32-byte key for sealing sensitive fields. **Required.**
    #[serde(default)]
    pub encryption_key: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// JSON data file. Unset keeps records in memory only.
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// OTLP/gRPC endpoint for span export. Unset disables export.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is invalid or the encryption key is
    /// missing or malformed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;
        Self::from_config(cfg)
    }

    fn from_config(cfg: config::Config) -> Result<Self> {
        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Build the field codec from the configured key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is missing or malformed.
    pub fn codec(&self) -> Result<FieldCodec, ConfigError> {
        FieldCodec::initialize(&self.encryption_key)
    }

    /// The OTLP endpoint, treating an empty value as unset.
    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otel_exporter_otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        EncryptionKey::parse(&self.encryption_key).context("ENCRYPTION_KEY is invalid")?;

        if let Some(path) = &self.data_path {
            if path.as_os_str().is_empty() {
                anyhow::bail!("DATA_PATH must not be empty when set");
            }
        }
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("listen_port", &self.listen_port)
            .field("data_path", &self.data_path)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}
