//! Database module (SQLite adapters)

pub mod connection;
pub mod schema;
pub mod sqlite;

pub use connection::create_pool;
pub use schema::create_schema;
pub use sqlite::SqlCatalogStore;
