//! Stored record types and the on-disk data file.
//!
//! Records carry sensitive attributes only as [`SealedValue`]s; there is no
//! field in which a plaintext serial number could be persisted.
//!
//! The data file is a versioned JSON snapshot written atomically: the new
//! contents go to `<path>.tmp`, are flushed, and then renamed over `<path>`.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::crypto::SealedValue;
use crate::model::{ItemStatus, ItemType, KitStatus};

/// Current data file format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A kit as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitRecord {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: KitStatus,
    #[serde(default)]
    pub serial_number_encrypted: Option<SealedValue>,
}

/// An inventory item as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: Uuid,
    #[serde(default)]
    pub current_kit_id: Option<Uuid>,
    pub item_type: ItemType,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub serial_number_encrypted: Option<SealedValue>,
}

/// Errors reading or writing the data file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem failure on the given path.
    #[error("data file I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a valid snapshot document.
    #[error("data file is not a valid snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file was written by a newer or unknown format version.
    #[error("unsupported data file version {0} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion(u32),
}

/// Full contents of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub kits: Vec<KitRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            kits: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Read a snapshot from `path`. A missing file yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] on I/O failure, invalid JSON, or an unknown
    /// format version.
    pub async fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Atomically replace the file at `path` with this snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the temporary file cannot be written,
    /// flushed, or renamed into place.
    pub async fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = sibling_path(path, ".tmp");
        let io_err = |p: &Path| {
            let p = p.to_owned();
            move |source: io::Error| SnapshotError::Io { path: p, source }
        };

        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_err(&tmp))?;
        file.write_all(&bytes).await.map_err(io_err(&tmp))?;
        file.sync_all().await.map_err(io_err(&tmp))?;
        drop(file);

        tokio::fs::rename(&tmp, path).await.map_err(io_err(path))
    }

    /// Number of sensitive values currently held in sealed form.
    pub fn sealed_value_count(&self) -> usize {
        let kits = self
            .kits
            .iter()
            .filter(|k| k.serial_number_encrypted.is_some())
            .count();
        let items = self
            .items
            .iter()
            .filter(|i| i.serial_number_encrypted.is_some())
            .count();
        kits + items
    }
}

/// `path` with `suffix` appended to its final component, e.g. `data.json.bak`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}
