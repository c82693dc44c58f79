//! Repository traits (ports)

pub mod catalog_store;

pub use catalog_store::{default_snapshot_name, CatalogStore, SnapshotInfo};

#[cfg(test)]
pub use catalog_store::MockCatalogStore;
