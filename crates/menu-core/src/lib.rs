//! # Menu Core
//!
//! Catalog domain, field validation, the catalog store port and the menu
//! service that drives every read-modify-write against it.

pub mod domain;
pub mod validation;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::{DomainError, StorageError, ValidationError};
pub use repositories::{CatalogStore, SnapshotInfo};
pub use services::{migrate_catalog, AdminCommand, MenuService, MigrationReport, OperationOutcome, PriceInput};
