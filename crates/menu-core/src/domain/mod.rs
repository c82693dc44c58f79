//! # Menu Core - Domain Module
//!
//! Catalog aggregate: categories owning ordered items.

pub mod catalog;
pub mod category;
pub mod item;

pub use catalog::{Catalog, CatalogStatistics, CategoryStatistics};
pub use category::{Category, CategoryInfo};
pub use item::{Item, Price};
