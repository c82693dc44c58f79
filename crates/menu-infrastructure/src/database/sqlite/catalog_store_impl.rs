// ============================================================================
// Menu Infrastructure - SQLite Catalog Store
// File: crates/menu-infrastructure/src/database/sqlite/catalog_store_impl.rs
// ============================================================================

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{error, info};

use menu_core::repositories::{default_snapshot_name, CatalogStore, SnapshotInfo};
use menu_core::validation::{check_catalog, round_to_cents};
use menu_core::{Catalog, Category, Item, Price, StorageError};
use menu_shared::StorageBackend;

use crate::database::schema::create_schema;

pub struct SqlCatalogStore {
    pool: SqlitePool,
}

impl SqlCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// Internal row type for the category/item join
#[derive(Debug, FromRow)]
struct CatalogRow {
    pub category_id: String,
    pub category_name: String,
    pub category_description: Option<String>,
    pub category_sort_order: i64,
    pub category_active: bool,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub item_description: Option<String>,
    pub price: Option<f64>,
    pub available: Option<bool>,
    pub item_sort_order: Option<i64>,
    pub dietary: Option<String>,
}

#[derive(Debug, FromRow)]
struct VersionRow {
    pub id: i64,
    pub version_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<VersionRow> for SnapshotInfo {
    fn from(row: VersionRow) -> Self {
        SnapshotInfo {
            id: row.id.to_string(),
            version_name: row.version_name,
            created_at: row.created_at,
        }
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |e: sqlx::Error| {
        error!("Database error {}: {}", context, e);
        StorageError::Database(e.to_string())
    }
}

fn item_from_row(row: &CatalogRow, item_id: &str) -> Result<Item, StorageError> {
    let cents = row
        .price
        .and_then(round_to_cents)
        .and_then(|c| u32::try_from(c).ok())
        .ok_or_else(|| StorageError::Corrupt(format!("item {} has an invalid price", item_id)))?;
    let dietary = match row.dietary.as_deref() {
        None | Some("") => Vec::new(),
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            StorageError::Corrupt(format!("item {} has invalid dietary tags: {}", item_id, e))
        })?,
    };

    Ok(Item {
        id: item_id.to_string(),
        name: row.item_name.clone().unwrap_or_default(),
        description: row.item_description.clone().unwrap_or_default(),
        price: Price::from_cents(cents),
        available: row.available.unwrap_or(true),
        sort_order: row.item_sort_order.unwrap_or(0) as i32,
        dietary,
    })
}

/// Folds the ordered join back into nested categories.
fn assemble(rows: Vec<CatalogRow>, last_updated: DateTime<Utc>) -> Result<Catalog, StorageError> {
    let mut categories: Vec<Category> = Vec::new();
    for row in rows {
        let is_new = categories
            .last()
            .map_or(true, |c| c.id != row.category_id);
        if is_new {
            categories.push(Category {
                id: row.category_id.clone(),
                name: row.category_name.clone(),
                description: row.category_description.clone(),
                sort_order: row.category_sort_order as i32,
                active: row.category_active,
                items: Vec::new(),
            });
        }
        if let Some(item_id) = row.item_id.as_deref() {
            let item = item_from_row(&row, item_id)?;
            if let Some(category) = categories.last_mut() {
                category.items.push(item);
            }
        }
    }

    Ok(Catalog {
        last_updated,
        categories,
    })
}

#[async_trait]
impl CatalogStore for SqlCatalogStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Relational
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        create_schema(&self.pool)
            .await
            .map_err(db_error("creating schema"))?;

        let stamped: Option<(String,)> =
            sqlx::query_as("SELECT last_updated FROM catalog_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("reading catalog state"))?;
        if stamped.is_some() {
            return Ok(());
        }

        let (categories,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("counting categories"))?;

        if categories == 0 {
            self.save(&Catalog::with_default_categories()).await?;
            info!("Seeded default menu categories");
        } else {
            sqlx::query("INSERT INTO catalog_state (id, last_updated) VALUES (1, ?)")
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(db_error("stamping catalog state"))?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<Catalog, StorageError> {
        let state: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT last_updated FROM catalog_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("reading catalog state"))?;
        let (last_updated,) = state.ok_or(StorageError::NotFound)?;

        let rows: Vec<CatalogRow> = sqlx::query_as(
            r#"
            SELECT
                c.id AS category_id, c.name AS category_name,
                c.description AS category_description,
                c.sort_order AS category_sort_order, c.active AS category_active,
                m.id AS item_id, m.name AS item_name, m.description AS item_description,
                CAST(m.price AS REAL) AS price, m.available,
                m.sort_order AS item_sort_order, m.dietary
            FROM categories c
            LEFT JOIN menu_items m ON m.category_id = c.id
            WHERE c.active = 1
            ORDER BY c.sort_order, c.id, m.sort_order, m.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("loading catalog"))?;

        let catalog = assemble(rows, last_updated)?;
        check_catalog(&catalog).map_err(|violation| {
            error!("Stored menu is invalid: {}", violation);
            StorageError::Corrupt(violation)
        })?;
        Ok(catalog)
    }

    /// One transaction: upsert categories, drop items no longer present in
    /// the saved categories, upsert the rest, stamp the catalog.
    async fn save(&self, catalog: &Catalog) -> Result<DateTime<Utc>, StorageError> {
        check_catalog(catalog).map_err(|violation| {
            error!("Refusing to write invalid menu: {}", violation);
            StorageError::Serialization(violation)
        })?;
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("beginning transaction"))?;

        for category in &catalog.categories {
            sqlx::query(
                r#"
                INSERT INTO categories (id, name, description, sort_order, active)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    sort_order = excluded.sort_order,
                    active = excluded.active
                "#,
            )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.sort_order)
            .bind(category.active)
            .execute(&mut *tx)
            .await
            .map_err(db_error("upserting category"))?;
        }

        let saved_categories: HashSet<&str> =
            catalog.categories.iter().map(|c| c.id.as_str()).collect();
        let saved_items: HashSet<&str> = catalog
            .categories
            .iter()
            .flat_map(|c| c.items.iter().map(|i| i.id.as_str()))
            .collect();

        let existing: Vec<(String, String)> =
            sqlx::query_as("SELECT id, category_id FROM menu_items")
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error("listing items"))?;
        for (item_id, category_id) in existing {
            if saved_categories.contains(category_id.as_str())
                && !saved_items.contains(item_id.as_str())
            {
                sqlx::query("DELETE FROM menu_items WHERE id = ?")
                    .bind(&item_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("deleting item"))?;
            }
        }

        for category in &catalog.categories {
            for item in &category.items {
                let dietary = serde_json::to_string(&item.dietary)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                sqlx::query(
                    r#"
                    INSERT INTO menu_items
                        (id, category_id, name, description, price, available, sort_order, dietary, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        category_id = excluded.category_id,
                        name = excluded.name,
                        description = excluded.description,
                        price = excluded.price,
                        available = excluded.available,
                        sort_order = excluded.sort_order,
                        dietary = excluded.dietary,
                        updated_at = excluded.updated_at
                    WHERE menu_items.category_id IS NOT excluded.category_id
                       OR menu_items.name IS NOT excluded.name
                       OR menu_items.description IS NOT excluded.description
                       OR menu_items.price IS NOT excluded.price
                       OR menu_items.available IS NOT excluded.available
                       OR menu_items.sort_order IS NOT excluded.sort_order
                       OR menu_items.dietary IS NOT excluded.dietary
                    "#,
                )
                .bind(&item.id)
                .bind(&category.id)
                .bind(&item.name)
                .bind(&item.description)
                .bind(item.price.as_f64())
                .bind(item.available)
                .bind(item.sort_order)
                .bind(dietary)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(db_error("upserting item"))?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO catalog_state (id, last_updated) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET last_updated = excluded.last_updated
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("stamping catalog state"))?;

        tx.commit().await.map_err(db_error("committing transaction"))?;
        Ok(now)
    }

    async fn snapshot(&self, name: Option<String>) -> Result<SnapshotInfo, StorageError> {
        let catalog = self.load().await?;
        let data = serde_json::to_string(&catalog)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let created_at = Utc::now();
        let version_name = name.unwrap_or_else(|| default_snapshot_name(created_at));

        let result = sqlx::query(
            "INSERT INTO menu_versions (version_name, data_snapshot, created_at) VALUES (?, ?, ?)",
        )
        .bind(&version_name)
        .bind(data)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("inserting snapshot"))?;

        Ok(SnapshotInfo {
            id: result.last_insert_rowid().to_string(),
            version_name,
            created_at,
        })
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, StorageError> {
        let rows: Vec<VersionRow> = sqlx::query_as(
            "SELECT id, version_name, created_at FROM menu_versions ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing snapshots"))?;

        Ok(rows.into_iter().map(SnapshotInfo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_pool;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> SqlCatalogStore {
        let url = format!("sqlite://{}", dir.path().join("menu.db").display());
        let pool = create_pool(&url, 4, Duration::from_secs(5)).await.unwrap();
        SqlCatalogStore::new(pool)
    }

    fn item(id: &str, name: &str, cents: u32, sort_order: i32) -> Item {
        Item::new(id.to_string(), name.to_string(), String::new(), Price::from_cents(cents), sort_order)
            .unwrap()
    }

    async fn updated_at(store: &SqlCatalogStore, id: &str) -> String {
        let (stamp,): (String,) = sqlx::query_as("SELECT updated_at FROM menu_items WHERE id = ?")
            .bind(id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        stamp
    }

    #[tokio::test]
    async fn test_load_before_initialize_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        create_schema(store.pool()).await.unwrap();
        assert!(matches!(store.load().await, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_initialize_seeds_once() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();

        let catalog = store.load().await.unwrap();
        let names: Vec<&str> = catalog.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Main Courses", "Sides & Appetizers", "Desserts"]);
        assert_eq!(catalog.item_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_in_sort_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        let mut catalog = store.load().await.unwrap();
        let mains = catalog.category_mut("mains").unwrap();
        mains.items.push(item("fish-1", "Fish", 1800, 2));
        mains.items.push(item("steak-1", "Steak", 2500, 1));
        let mut pie = item("pie-1", "Pie", 650, 1);
        pie.dietary = vec!["vegetarian".to_string()];
        pie.available = false;
        catalog.category_mut("desserts").unwrap().items.push(pie);

        let stamp = store.save(&catalog).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.last_updated, stamp);

        let mains: Vec<&str> = loaded.category("mains").unwrap().items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(mains, vec!["steak-1", "fish-1"]);
        let (_, pie) = loaded.find_item("pie-1").unwrap();
        assert_eq!(pie.dietary, vec!["vegetarian".to_string()]);
        assert!(!pie.available);
        assert_eq!(pie.price.cents(), 650);
    }

    #[tokio::test]
    async fn test_save_deletes_missing_items_but_keeps_categories() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        let mut catalog = store.load().await.unwrap();
        catalog.category_mut("mains").unwrap().items.push(item("steak-1", "Steak", 2500, 1));
        catalog.category_mut("sides").unwrap().items.push(item("chips-1", "Chips", 400, 1));
        store.save(&catalog).await.unwrap();

        catalog.remove_item("steak-1");
        catalog.categories.retain(|c| c.id != "desserts");
        store.save(&catalog).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(!loaded.contains_item("steak-1"));
        assert!(loaded.contains_item("chips-1"));
        assert!(loaded.category("desserts").is_some());
    }

    #[tokio::test]
    async fn test_inactive_category_is_hidden_and_kept() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        let mut catalog = store.load().await.unwrap();
        catalog.category_mut("desserts").unwrap().items.push(item("tart-1", "Tart", 700, 1));
        store.save(&catalog).await.unwrap();

        sqlx::query("UPDATE categories SET active = 0 WHERE id = 'desserts'")
            .execute(store.pool())
            .await
            .unwrap();
        let catalog = store.load().await.unwrap();
        assert!(catalog.category("desserts").is_none());

        // Saving the filtered view must not drop the hidden category's items.
        store.save(&catalog).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM menu_items WHERE id = 'tart-1'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_updated_at_moves_only_on_change() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        let mut catalog = store.load().await.unwrap();
        catalog.category_mut("mains").unwrap().items.push(item("steak-1", "Steak", 2500, 1));
        catalog.category_mut("mains").unwrap().items.push(item("fish-1", "Fish", 1800, 2));
        store.save(&catalog).await.unwrap();
        let steak_before = updated_at(&store, "steak-1").await;
        let fish_before = updated_at(&store, "fish-1").await;

        catalog.find_item_mut("fish-1").unwrap().toggle_availability();
        store.save(&catalog).await.unwrap();

        assert_eq!(updated_at(&store, "steak-1").await, steak_before);
        assert_ne!(updated_at(&store, "fish-1").await, fish_before);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();
        let before = store.load().await.unwrap();

        sqlx::query(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON menu_items WHEN NEW.id = 'boom-1' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let mut catalog = before.clone();
        let mains = catalog.category_mut("mains").unwrap();
        mains.items.push(item("steak-1", "Steak", 2500, 1));
        mains.items.push(item("boom-1", "Boom", 100, 2));

        let err = store.save(&catalog).await.unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));

        let after = store.load().await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_out_of_range_price_is_never_written() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();
        let before = store.load().await.unwrap();

        let mut catalog = before.clone();
        let mut free = item("free-1", "Freebie", 100, 1);
        free.price = Price::from_cents(0);
        catalog.category_mut("mains").unwrap().items.push(free);

        let err = store.save(&catalog).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_markup_in_stored_name_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        sqlx::query(
            "INSERT INTO menu_items (id, category_id, name, price) VALUES ('free-1', 'mains', '<b>Free</b>', 1.5)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        assert!(matches!(store.load().await, Err(StorageError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_decimal_price_column() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        let mut catalog = store.load().await.unwrap();
        catalog.category_mut("mains").unwrap().items.push(item("steak-1", "Steak", 2499, 1));
        store.save(&catalog).await.unwrap();

        let (price,): (f64,) = sqlx::query_as("SELECT price FROM menu_items WHERE id = 'steak-1'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(price, 24.99);

        // Rows written by other tools carry plain decimals too.
        sqlx::query(
            "INSERT INTO menu_items (id, category_id, name, price, sort_order) VALUES ('tart-1', 'desserts', 'Tart', 6, 1)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.find_item("tart-1").unwrap().1.price.cents(), 600);
        assert_eq!(loaded.find_item("steak-1").unwrap().1.price.cents(), 2499);
    }

    #[tokio::test]
    async fn test_existing_database_layout_loads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        for statement in [
            "CREATE TABLE categories (id VARCHAR(50) PRIMARY KEY, name VARCHAR(100) NOT NULL, \
             description TEXT, sort_order INT DEFAULT 0, active BOOLEAN DEFAULT 1)",
            "CREATE TABLE menu_items (id VARCHAR(100) PRIMARY KEY, category_id VARCHAR(50) NOT NULL, \
             name VARCHAR(100) NOT NULL, description TEXT, price DECIMAL(5,2) NOT NULL, \
             available BOOLEAN DEFAULT 1, sort_order INT DEFAULT 0, \
             created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP, updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
            "INSERT INTO categories (id, name, sort_order) VALUES ('mains', 'Main Courses', 1)",
            "INSERT INTO menu_items (id, category_id, name, description, price, sort_order) \
             VALUES ('steak-1', 'mains', 'Grilled Steak', NULL, 24.99, 1)",
        ] {
            sqlx::query(statement).execute(store.pool()).await.unwrap();
        }

        store.initialize().await.unwrap();
        let mut catalog = store.load().await.unwrap();
        let (_, steak) = catalog.find_item("steak-1").unwrap();
        assert_eq!(steak.price.cents(), 2499);
        assert!(steak.dietary.is_empty());
        assert_eq!(steak.description, "");

        catalog.find_item_mut("steak-1").unwrap().price = Price::from_cents(2500);
        store.save(&catalog).await.unwrap();
        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.find_item("steak-1").unwrap().1.price.cents(), 2500);
    }

    #[tokio::test]
    async fn test_snapshots_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.initialize().await.unwrap();

        let first = store.snapshot(Some("Before launch".to_string())).await.unwrap();
        let second = store.snapshot(None).await.unwrap();
        assert!(second.version_name.starts_with("Manual backup - "));

        let listed = store.list_snapshots().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        let (data,): (String,) = sqlx::query_as("SELECT data_snapshot FROM menu_versions WHERE id = ?")
            .bind(first.id.parse::<i64>().unwrap())
            .fetch_one(store.pool())
            .await
            .unwrap();
        let restored: Catalog = serde_json::from_str(&data).unwrap();
        assert_eq!(restored.categories.len(), 3);
    }
}
