//! # Menu Infrastructure
//!
//! Storage adapters for the catalog store port: a JSON document file and
//! a SQLite database. The backend is picked once, from configuration.

pub mod database;
pub mod document;

use std::sync::Arc;

use menu_core::{CatalogStore, StorageError};
use menu_shared::config::StorageSettings;
use menu_shared::StorageBackend;
use tracing::{error, info};

pub use database::{create_pool, create_schema, SqlCatalogStore};
pub use document::DocumentStore;

/// Builds the configured store. The caller still has to `initialize` it.
pub async fn open_catalog_store(
    settings: &StorageSettings,
) -> Result<Arc<dyn CatalogStore>, StorageError> {
    match settings.backend {
        StorageBackend::Document => {
            let store = DocumentStore::from_settings(settings);
            info!("Using document store at {}", store.path().display());
            Ok(Arc::new(store))
        }
        StorageBackend::Relational => {
            let pool = create_pool(
                &settings.database_url,
                settings.max_connections,
                settings.lock_timeout(),
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to {}: {}", settings.database_url, e);
                StorageError::Database(e.to_string())
            })?;
            info!("Using relational store at {}", settings.database_url);
            Ok(Arc::new(SqlCatalogStore::new(pool)))
        }
    }
}
