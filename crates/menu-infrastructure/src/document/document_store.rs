// ============================================================================
// Menu Infrastructure - JSON Document Store
// File: crates/menu-infrastructure/src/document/document_store.rs
// ============================================================================
//! The whole catalog as one JSON file.
//!
//! Writers take an exclusive lock on `<menu>.lock`, copy the current file to
//! `backups/`, write a temp file next to the target, fsync it and rename it
//! over the target. Readers never lock: the rename is atomic, so a reader
//! sees either the old or the new file.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use menu_core::repositories::{default_snapshot_name, CatalogStore, SnapshotInfo};
use menu_core::validation::check_catalog;
use menu_core::{Catalog, StorageError};
use menu_shared::config::StorageSettings;
use menu_shared::utils::slugify;
use menu_shared::StorageBackend;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);
const FILE_STAMP: &str = "%Y%m%dT%H%M%S%6fZ";

#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
    lock_timeout: Duration,
    backup_retention: usize,
}

/// On-disk form of a named snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    version_name: String,
    created_at: DateTime<Utc>,
    data: Catalog,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration, backup_retention: usize) -> Self {
        Self {
            path: path.into(),
            lock_timeout,
            backup_retention,
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(
            settings.menu_path(),
            settings.lock_timeout(),
            settings.backup_retention,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "menu".to_string())
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn backups_dir(&self) -> PathBuf {
        self.dir().join("backups")
    }

    fn versions_dir(&self) -> PathBuf {
        self.dir().join("versions")
    }

    fn read_catalog(&self) -> Result<Catalog, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
            Err(e) => {
                error!("Failed to read menu file {}: {}", self.path.display(), e);
                return Err(StorageError::from(e));
            }
        };
        let catalog: Catalog = serde_json::from_slice(&bytes).map_err(|e| {
            error!("Menu file {} is corrupt: {}", self.path.display(), e);
            StorageError::Corrupt(e.to_string())
        })?;
        check_catalog(&catalog).map_err(|violation| {
            error!("Menu file {} is invalid: {}", self.path.display(), violation);
            StorageError::Corrupt(violation)
        })?;
        Ok(catalog)
    }

    /// Polls the lock file until it is ours or the timeout elapses.
    fn acquire_lock(&self) -> Result<File, StorageError> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;

        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                    if Instant::now() >= deadline {
                        warn!("Timed out waiting for lock on {}", self.path.display());
                        return Err(StorageError::LockTimeout);
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(StorageError::from(e)),
            }
        }
    }

    fn write_locked(&self, catalog: &Catalog) -> Result<DateTime<Utc>, StorageError> {
        check_catalog(catalog).map_err(|violation| {
            error!("Refusing to write invalid menu: {}", violation);
            StorageError::Serialization(violation)
        })?;
        let lock_file = self.acquire_lock()?;
        let result = self.backup_and_replace(catalog);
        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to release lock on {}: {}", self.path.display(), e);
        }
        result
    }

    fn backup_and_replace(&self, catalog: &Catalog) -> Result<DateTime<Utc>, StorageError> {
        let now = Utc::now();
        if self.backup_retention > 0 && self.path.exists() {
            self.backup_current(now)?;
        }

        let mut stamped = catalog.clone();
        stamped.last_updated = now;
        let bytes = serde_json::to_vec_pretty(&stamped)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_atomic(&self.path, &bytes)?;
        Ok(now)
    }

    fn backup_current(&self, now: DateTime<Utc>) -> Result<(), StorageError> {
        let dir = self.backups_dir();
        fs::create_dir_all(&dir)?;
        let prefix = format!("{}-", self.stem());
        let target = dir.join(format!("{}{}.json", prefix, now.format(FILE_STAMP)));
        fs::copy(&self.path, &target)?;
        debug!("Backed up menu to {}", target.display());

        let mut backups: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".json"))
            })
            .collect();
        backups.sort();
        let excess = backups.len().saturating_sub(self.backup_retention);
        for old in backups.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&old) {
                warn!("Failed to prune backup {}: {}", old.display(), e);
            }
        }
        Ok(())
    }

    fn write_snapshot(&self, name: Option<String>) -> Result<SnapshotInfo, StorageError> {
        let data = self.read_catalog()?;
        let created_at = Utc::now();
        let version_name = name.unwrap_or_else(|| default_snapshot_name(created_at));
        let slug = match slugify(&version_name) {
            s if s.is_empty() => "snapshot".to_string(),
            s => s,
        };
        let id = format!("{}-{}", slug, created_at.format(FILE_STAMP));

        let dir = self.versions_dir();
        fs::create_dir_all(&dir)?;
        let document = SnapshotDocument {
            version_name: version_name.clone(),
            created_at,
            data,
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_atomic(&dir.join(format!("{}.json", id)), &bytes)?;

        Ok(SnapshotInfo {
            id,
            version_name,
            created_at,
        })
    }

    fn read_snapshots(&self) -> Result<Vec<SnapshotInfo>, StorageError> {
        let dir = self.versions_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from(e)),
        };

        let mut snapshots = Vec::new();
        for path in entries.filter_map(|e| e.ok().map(|e| e.path())) {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|b| serde_json::from_slice::<SnapshotDocument>(&b).map_err(|e| e.to_string()));
            match parsed {
                Ok(doc) => snapshots.push(SnapshotInfo {
                    id: path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    version_name: doc.version_name,
                    created_at: doc.created_at,
                }),
                Err(e) => warn!("Skipping unreadable snapshot {}: {}", path.display(), e),
            }
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(snapshots)
    }
}

/// Temp file in the target's directory, fsync, rename. The temp file is
/// removed on any error.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| StorageError::from(e.error))?;
    Ok(())
}

async fn run_blocking<T, F>(task: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| StorageError::Io(format!("blocking task failed: {}", e)))?
}

#[async_trait]
impl CatalogStore for DocumentStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Document
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        let store = self.clone();
        run_blocking(move || {
            fs::create_dir_all(store.dir()).map_err(|e| {
                error!("Cannot create data directory {}: {}", store.dir().display(), e);
                StorageError::from(e)
            })?;
            if store.path.exists() {
                return Ok(());
            }
            store.write_locked(&Catalog::with_default_categories())?;
            info!("Seeded default menu at {}", store.path.display());
            Ok(())
        })
        .await
    }

    async fn load(&self) -> Result<Catalog, StorageError> {
        let store = self.clone();
        run_blocking(move || store.read_catalog()).await
    }

    async fn save(&self, catalog: &Catalog) -> Result<DateTime<Utc>, StorageError> {
        let store = self.clone();
        let catalog = catalog.clone();
        run_blocking(move || store.write_locked(&catalog)).await
    }

    async fn snapshot(&self, name: Option<String>) -> Result<SnapshotInfo, StorageError> {
        let store = self.clone();
        run_blocking(move || store.write_snapshot(name)).await
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, StorageError> {
        let store = self.clone();
        run_blocking(move || store.read_snapshots()).await
    }
}
