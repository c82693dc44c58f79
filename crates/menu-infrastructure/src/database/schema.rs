//! Table definitions, applied idempotently at startup
//!
//! `menu_items.price` holds the decimal amount (two places), the same
//! column an existing menu database already carries.

use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT,
        sort_order  INTEGER NOT NULL DEFAULT 0,
        active      BOOLEAN NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS menu_items (
        id          TEXT PRIMARY KEY,
        category_id TEXT NOT NULL,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price       REAL NOT NULL CHECK (price BETWEEN 0.01 AND 999.99),
        available   BOOLEAN NOT NULL DEFAULT 1,
        sort_order  INTEGER NOT NULL DEFAULT 0,
        dietary     TEXT NOT NULL DEFAULT '[]',
        created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_menu_items_category ON menu_items (category_id, sort_order)",
    r#"
    CREATE TABLE IF NOT EXISTS menu_versions (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        version_name  TEXT NOT NULL,
        data_snapshot TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog_state (
        id           INTEGER PRIMARY KEY CHECK (id = 1),
        last_updated TEXT NOT NULL
    )
    "#,
];

/// Columns an older menu database may lack: (table, column, declaration).
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[("menu_items", "dietary", "TEXT NOT NULL DEFAULT '[]'")];

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    add_missing_columns(pool).await
}

async fn add_missing_columns(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for (table, column, declaration) in ADDED_COLUMNS {
        let present: Option<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info(?) WHERE name = ?")
                .bind(*table)
                .bind(*column)
                .fetch_optional(pool)
                .await?;
        if present.is_none() {
            sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, declaration))
                .execute(pool)
                .await?;
            info!("Added column {}.{}", table, column);
        }
    }
    Ok(())
}
