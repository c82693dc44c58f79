//! One-shot copy of a catalog between stores (document -> relational).

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::domain::Catalog;
use crate::error::DomainError;
use crate::repositories::{CatalogStore, SnapshotInfo};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub categories: usize,
    pub items: usize,
    pub snapshot: SnapshotInfo,
}

/// Copies the source catalog into `target` and records a snapshot of the
/// result there. Legacy documents without sort orders get positional ones.
pub async fn migrate_catalog(
    source: &dyn CatalogStore,
    target: &dyn CatalogStore,
) -> Result<MigrationReport, DomainError> {
    info!(
        "Migrating catalog from {} store to {} store",
        source.backend(),
        target.backend()
    );

    let mut catalog = source.load().await.map_err(|e| {
        error!("Migration source could not be read: {}", e);
        DomainError::from(e)
    })?;
    normalize_sort_orders(&mut catalog);

    target.save(&catalog).await.map_err(|e| {
        error!("Migration target rejected catalog: {}", e);
        DomainError::from(e)
    })?;

    let name = format!("Migration from JSON - {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    let snapshot = target.snapshot(Some(name)).await?;

    let report = MigrationReport {
        categories: catalog.categories.len(),
        items: catalog.item_count(),
        snapshot,
    };
    info!(
        "Migration complete: {} categories, {} items",
        report.categories, report.items
    );
    Ok(report)
}

fn normalize_sort_orders(catalog: &mut Catalog) {
    if catalog.categories.iter().all(|c| c.sort_order == 0) {
        for (index, category) in catalog.categories.iter_mut().enumerate() {
            category.sort_order = index as i32 + 1;
        }
    }
    for category in &mut catalog.categories {
        if category.items.iter().all(|i| i.sort_order == 0) {
            for (index, item) in category.items.iter_mut().enumerate() {
                item.sort_order = index as i32 + 1;
            }
        }
    }
}
