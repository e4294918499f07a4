//! Re-sealing a data file under a new key.
//!
//! Migration is all-or-nothing: every stored value is opened with the old key
//! before anything is written, and the first value that fails stops the run
//! with the record it belongs to. The file is only replaced once the whole
//! snapshot has been re-sealed in memory.

use std::path::{Path, PathBuf};

use common::crypto::{DecryptError, EncryptError};
use common::records::{sibling_path, Snapshot, SnapshotError};
use common::FieldCodec;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Errors that stop a migration. Nothing has been written when one is returned.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("old and new keys are identical (fingerprint {0})")]
    SameKey(String),

    #[error("data file {} does not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("{kind} {id}: stored serial number cannot be opened with the old key: {source}")]
    Decode {
        kind: &'static str,
        id: Uuid,
        #[source]
        source: DecryptError,
    },

    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("failed to write backup {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Counts from a completed (or dry-run) migration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub kits: usize,
    pub items: usize,
    /// Values that were present and got re-sealed.
    pub resealed: usize,
    /// Records with no serial number; left absent.
    pub absent: usize,
}

/// Re-seal every value in `snapshot` from `old` to `new`, in place.
///
/// On error `snapshot` may be partially rewritten; callers must discard it.
pub fn reseal(
    snapshot: &mut Snapshot,
    old: &FieldCodec,
    new: &FieldCodec,
) -> Result<MigrationReport, MigrateError> {
    if old.fingerprint() == new.fingerprint() {
        return Err(MigrateError::SameKey(old.fingerprint().to_string()));
    }

    let mut report = MigrationReport {
        kits: snapshot.kits.len(),
        items: snapshot.items.len(),
        ..MigrationReport::default()
    };

    // Open everything first so a bad value aborts before any re-sealing.
    let kit_plain = snapshot
        .kits
        .iter()
        .map(|k| {
            old.decode(k.serial_number_encrypted.as_ref())
                .map_err(|source| MigrateError::Decode { kind: "kit", id: k.id, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let item_plain = snapshot
        .items
        .iter()
        .map(|i| {
            old.decode(i.serial_number_encrypted.as_ref())
                .map_err(|source| MigrateError::Decode { kind: "item", id: i.id, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let slots = snapshot
        .kits
        .iter_mut()
        .map(|k| &mut k.serial_number_encrypted)
        .chain(snapshot.items.iter_mut().map(|i| &mut i.serial_number_encrypted));
    for (slot, plain) in slots.zip(kit_plain.into_iter().chain(item_plain)) {
        match plain {
            Some(_) => report.resealed += 1,
            None => report.absent += 1,
        }
        *slot = new.encode(plain.as_deref())?;
    }

    Ok(report)
}

/// Migrate the data file at `path` from `old` to `new`.
///
/// Unless `dry_run` is set, the current file is first copied to
/// `<path>.bak` and then atomically replaced.
#[instrument(name = "migrate", skip(path, old, new), fields(data_path = %path.display()))]
pub async fn run(
    path: &Path,
    old: &FieldCodec,
    new: &FieldCodec,
    dry_run: bool,
) -> Result<MigrationReport, MigrateError> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|source| SnapshotError::Io {
            path: path.to_owned(),
            source,
        })?;
    if !exists {
        return Err(MigrateError::MissingFile(path.to_owned()));
    }

    let mut snapshot = Snapshot::load(path).await?;
    info!(
        path = %path.display(),
        kits = snapshot.kits.len(),
        items = snapshot.items.len(),
        old_key = %old.fingerprint(),
        new_key = %new.fingerprint(),
        "data file loaded"
    );

    let report = reseal(&mut snapshot, old, new)?;

    if dry_run {
        warn!(resealed = report.resealed, "dry run; data file left unchanged");
        return Ok(report);
    }

    let backup = sibling_path(path, ".bak");
    tokio::fs::copy(path, &backup)
        .await
        .map_err(|source| MigrateError::Backup {
            path: backup.clone(),
            source,
        })?;
    snapshot.save(path).await?;

    info!(
        backup = %backup.display(),
        kits = report.kits,
        items = report.items,
        resealed = report.resealed,
        absent = report.absent,
        "data file re-sealed"
    );
    Ok(report)
}
