//! Domain services (business logic)

pub mod command;
pub mod menu_service;
pub mod migration;

pub use command::{AdminCommand, OperationOutcome, PriceInput};
pub use menu_service::MenuService;
pub use migration::{migrate_catalog, MigrationReport};
