//! Configuration loading and validation for the rekey tool.

use std::path::PathBuf;

use anyhow::{Context, Result};
use common::crypto::EncryptionKey;
use serde::Deserialize;

/// Validated rekey configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Key the data file is currently sealed under. **Required.**
    #[serde(default)]
    pub old_encryption_key: String,

    /// Key to re-seal every value under. **Required.**
    #[serde(default)]
    pub new_encryption_key: String,

    /// Data file to migrate in place. **Required.**
    pub data_path: PathBuf,

    /// Decode and re-seal in memory only; leave the file untouched.
    #[serde(default)]
    pub dry_run: bool,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build rekey configuration")?;
        Self::from_config(cfg)
    }

    fn from_config(cfg: config::Config) -> Result<Self> {
        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise rekey configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        let old = EncryptionKey::parse(&self.old_encryption_key)
            .context("OLD_ENCRYPTION_KEY is invalid")?;
        let new = EncryptionKey::parse(&self.new_encryption_key)
            .context("NEW_ENCRYPTION_KEY is invalid")?;
        if old.fingerprint() == new.fingerprint() {
            anyhow::bail!("OLD_ENCRYPTION_KEY and NEW_ENCRYPTION_KEY are the same key");
        }
        if self.data_path.as_os_str().is_empty() {
            anyhow::bail!("DATA_PATH is required and must not be empty");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("old_encryption_key", &"[REDACTED]")
            .field("new_encryption_key", &"[REDACTED]")
            .field("data_path", &self.data_path)
            .field("dry_run", &self.dry_run)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 32 bytes of 'A' and 'B' respectively.
    const KEY_A: &str = "QUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUE=";
    const KEY_B: &str = "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=";

    fn load(old: &str, new: &str, path: Option<&str>) -> Result<Config> {
        let mut builder = config::Config::builder()
            .set_override("old_encryption_key", old)
            .unwrap()
            .set_override("new_encryption_key", new)
            .unwrap();
        if let Some(p) = path {
            builder = builder.set_override("data_path", p).unwrap();
        }
        Config::from_config(builder.build().unwrap())
    }

    #[test]
    fn defaults() {
        let cfg = load(KEY_A, KEY_B, Some("/var/lib/custody/data.json")).unwrap();
        assert!(!cfg.dry_run);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn rejects_identical_keys() {
        let err = load(KEY_A, KEY_A, Some("data.json")).unwrap_err();
        assert!(format!("{err:#}").contains("same key"));
    }

    #[test]
    fn rejects_invalid_keys() {
        let err = load("short", KEY_B, Some("data.json")).unwrap_err();
        assert!(format!("{err:#}").contains("OLD_ENCRYPTION_KEY"));
        let err = load(KEY_A, "", Some("data.json")).unwrap_err();
        assert!(format!("{err:#}").contains("NEW_ENCRYPTION_KEY"));
    }

    #[test]
    fn requires_data_path() {
        assert!(load(KEY_A, KEY_B, None).is_err());
    }

    #[test]
    fn debug_redacts_keys() {
        let cfg = load(KEY_A, KEY_B, Some("data.json")).unwrap();
        let out = format!("{cfg:?}");
        assert!(!out.contains(KEY_A));
        assert!(!out.contains(KEY_B));
    }
}
