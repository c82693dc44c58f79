//! SQLite repository implementations

pub mod catalog_store_impl;

pub use catalog_store_impl::SqlCatalogStore;
