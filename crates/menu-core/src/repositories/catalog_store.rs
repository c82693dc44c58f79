//! Catalog store trait (port)
//!
//! Both the JSON document store and the relational store implement this.
//! The menu service only ever sees `Arc<dyn CatalogStore>`, selected once
//! at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use menu_shared::StorageBackend;
use serde::{Deserialize, Serialize};

use crate::domain::Catalog;
use crate::error::StorageError;

/// A named copy of the catalog kept apart from the live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub id: String,
    pub version_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// Creates the backing storage and seeds the default catalog when none
    /// exists yet. Failing here is fatal at startup.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Reads the whole catalog. `NotFound` when nothing was ever stored,
    /// `Corrupt` when the stored bytes are not a well-formed catalog.
    async fn load(&self) -> Result<Catalog, StorageError>;

    /// Replaces the stored catalog atomically and returns the new
    /// `lastUpdated` stamp. On error the previous catalog is untouched.
    async fn save(&self, catalog: &Catalog) -> Result<DateTime<Utc>, StorageError>;

    async fn snapshot(&self, name: Option<String>) -> Result<SnapshotInfo, StorageError>;

    /// Newest first.
    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, StorageError>;
}

/// Name given to snapshots created without one.
pub fn default_snapshot_name(now: DateTime<Utc>) -> String {
    format!("Manual backup - {}", now.format("%Y-%m-%d %H:%M:%S"))
}
