//! [`RecordStore`]: shared, optionally file-backed holder of the current snapshot.
//!
//! Reads are lock-free via `arc-swap`. Writers are serialised by an async mutex,
//! mutate a private copy, persist it, and only then publish it, so a failed
//! write leaves both the file and the visible state untouched.

use std::{path::PathBuf, sync::Arc};

use arc_swap::ArcSwap;
use common::records::{Snapshot, SnapshotError};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone, Debug)]
pub struct RecordStore {
    current: Arc<ArcSwap<Snapshot>>,
    writer: Arc<Mutex<()>>,
    path: Option<Arc<PathBuf>>,
}

impl RecordStore {
    /// Create an empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
            writer: Arc::new(Mutex::new(())),
            path: None,
        }
    }

    /// Open the data file at `path`, starting empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file exists but cannot be read or parsed.
    pub async fn open(path: PathBuf) -> Result<Self, SnapshotError> {
        let snapshot = Snapshot::load(&path).await?;
        info!(
            path = %path.display(),
            kits = snapshot.kits.len(),
            items = snapshot.items.len(),
            "data file loaded"
        );
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(snapshot)),
            writer: Arc::new(Mutex::new(())),
            path: Some(Arc::new(path)),
        })
    }

    /// Returns `true` if writes are persisted to a data file.
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// The current snapshot. Lock-free; safe on the request hot path.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Apply `f` to a copy of the current snapshot, persist it, and publish it.
    ///
    /// If `f` returns an error nothing is written or published.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or the persistence failure converted into `E`.
    pub async fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Snapshot) -> Result<T, E>,
        E: From<SnapshotError>,
    {
        let _guard = self.writer.lock().await;
        let mut next = Snapshot::clone(&self.current.load());
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            next.save(path).await?;
        }
        self.current.store(Arc::new(next));
        Ok(out)
    }
}
