// ============================================================================
// Menu Core - Menu Service
// File: crates/menu-core/src/services/menu_service.rs
// ============================================================================
//! Menu administration: every mutation is one load -> modify -> save cycle
//! against the catalog store, serialized through a single write gate.

use std::sync::Arc;
use std::time::Duration;

use menu_shared::utils::slugify;
use menu_shared::StorageBackend;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, info, warn};

use crate::domain::{Catalog, CatalogStatistics, Category, CategoryInfo, Item};
use crate::error::{DomainError, StorageError, ValidationError};
use crate::repositories::{CatalogStore, SnapshotInfo};
use crate::services::command::{AdminCommand, OperationOutcome, PriceInput};
use crate::validation;

const MAX_ID_ATTEMPTS: usize = 8;

pub struct MenuService {
    store: Arc<dyn CatalogStore>,
    write_gate: Semaphore,
    lock_timeout: Duration,
}

impl MenuService {
    pub fn new(store: Arc<dyn CatalogStore>, lock_timeout: Duration) -> Self {
        Self {
            store,
            write_gate: Semaphore::new(1),
            lock_timeout,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.store.backend()
    }

    /// Full catalog, as the admin sees it.
    pub async fn load(&self) -> Result<Catalog, DomainError> {
        self.store.load().await.map_err(|e| {
            if !matches!(e, StorageError::NotFound) {
                error!("Failed to load menu: {}", e);
            }
            DomainError::from(e)
        })
    }

    /// Catalog filtered for the public site.
    pub async fn public_menu(&self) -> Result<Catalog, DomainError> {
        Ok(self.load().await?.public_view())
    }

    /// Active categories, without items.
    pub async fn categories(&self) -> Result<Vec<CategoryInfo>, DomainError> {
        let catalog = self.load().await?;
        let mut categories: Vec<CategoryInfo> =
            catalog.active_categories().map(Category::info).collect();
        categories.sort_by_key(|c| c.sort_order);
        Ok(categories)
    }

    pub async fn statistics(&self) -> Result<CatalogStatistics, DomainError> {
        Ok(self.load().await?.statistics())
    }

    /// Runs one typed admin command.
    pub async fn execute(&self, command: AdminCommand) -> Result<OperationOutcome, DomainError> {
        debug!("Executing admin command: {}", command.name());
        match command {
            AdminCommand::AddItem {
                category_id,
                item_name,
                item_description,
                item_price,
            } => {
                self.add_item(&category_id, &item_name, &item_description, &item_price)
                    .await
            }
            AdminCommand::UpdateItem {
                item_id,
                item_name,
                item_description,
                item_price,
            } => {
                self.update_item(&item_id, &item_name, &item_description, &item_price)
                    .await
            }
            AdminCommand::ToggleAvailability { item_id } => self.toggle_availability(&item_id).await,
            AdminCommand::DeleteItem { item_id } => self.delete_item(&item_id).await,
            AdminCommand::AddCategory {
                category_name,
                category_description,
            } => {
                self.add_category(&category_name, category_description.as_deref())
                    .await
            }
            AdminCommand::CreateSnapshot { version_name } => {
                let snapshot = self.create_snapshot(version_name).await?;
                Ok(OperationOutcome::new("Backup created successfully").with_snapshot(snapshot))
            }
        }
    }

    /// Appends a new available item to the end of a category.
    pub async fn add_item(
        &self,
        category_id: &str,
        name: &str,
        description: &str,
        price: &PriceInput,
    ) -> Result<OperationOutcome, DomainError> {
        let name = validated_name(name)?;
        let description = validation::sanitize_description(description);
        let price = price.validate().map_err(|e| {
            warn!("Rejected price for new item '{}'", name);
            e
        })?;

        self.mutate("add_item", |catalog| {
            if !validation::is_valid_category(category_id, catalog) {
                warn!("Rejected new item: invalid category '{}'", category_id);
                return Err(ValidationError::InvalidCategory(category_id.to_string()).into());
            }

            let item_id = unique_item_id(catalog, &name)?;
            let category = catalog
                .category_mut(category_id)
                .ok_or_else(|| DomainError::CategoryNotFound(category_id.to_string()))?;
            let item = Item::new(
                item_id.clone(),
                name.clone(),
                description.clone(),
                price,
                category.next_item_sort_order(),
            )
            .map_err(|_| ValidationError::InvalidName)?;
            category.items.push(item);

            Ok(OperationOutcome::new("Item added successfully").with_item_id(&item_id))
        })
        .await
    }

    /// Replaces name, description and price of an existing item in place.
    pub async fn update_item(
        &self,
        item_id: &str,
        name: &str,
        description: &str,
        price: &PriceInput,
    ) -> Result<OperationOutcome, DomainError> {
        let name = validated_name(name)?;
        let description = validation::sanitize_description(description);
        let price = price.validate()?;

        self.mutate("update_item", |catalog| {
            let (category_id, active) = catalog
                .find_item(item_id)
                .map(|(category, _)| (category.id.clone(), category.active))
                .ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))?;
            // Same rule as add_item: hidden categories are not editable.
            if !active {
                warn!("Rejected update of '{}': category '{}' is inactive", item_id, category_id);
                return Err(ValidationError::InvalidCategory(category_id).into());
            }

            let item = catalog
                .find_item_mut(item_id)
                .ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))?;
            item.name = name.clone();
            item.description = description.clone();
            item.price = price;

            Ok(OperationOutcome::new("Item updated successfully").with_item_id(item_id))
        })
        .await
    }

    /// Flips `available`. Every call persists a write.
    pub async fn toggle_availability(&self, item_id: &str) -> Result<OperationOutcome, DomainError> {
        self.mutate("toggle_availability", |catalog| {
            let item = catalog
                .find_item_mut(item_id)
                .ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))?;
            let available = item.toggle_availability();

            Ok(OperationOutcome::new("Item availability updated")
                .with_item_id(item_id)
                .with_available(available))
        })
        .await
    }

    /// Removes an item; siblings keep their order and sort values.
    pub async fn delete_item(&self, item_id: &str) -> Result<OperationOutcome, DomainError> {
        self.mutate("delete_item", |catalog| {
            catalog
                .remove_item(item_id)
                .ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))?;

            Ok(OperationOutcome::new("Item deleted successfully").with_item_id(item_id))
        })
        .await
    }

    /// Appends a category. Categories are append-only: there is no delete
    /// or reorder operation.
    pub async fn add_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<OperationOutcome, DomainError> {
        let name = validation::sanitize_name(name);
        if !validation::is_valid_name(&name) {
            return Err(ValidationError::InvalidCategoryName.into());
        }
        let category_id = slugify(&name);
        if category_id.is_empty() {
            return Err(ValidationError::InvalidCategoryName.into());
        }
        let description = description
            .map(validation::sanitize_description)
            .filter(|d| !d.is_empty());

        self.mutate("add_category", |catalog| {
            if catalog.category(&category_id).is_some() {
                return Err(ValidationError::DuplicateCategory(category_id.clone()).into());
            }
            let sort_order = catalog.next_category_sort_order();
            catalog
                .categories
                .push(Category::new(&category_id, &name, description.clone(), sort_order));

            Ok(OperationOutcome::new("Category added successfully").with_category_id(&category_id))
        })
        .await
    }

    pub async fn create_snapshot(&self, name: Option<String>) -> Result<SnapshotInfo, DomainError> {
        let name = name
            .map(|n| validation::sanitize_description(&n))
            .filter(|n| !n.is_empty());
        let snapshot = self.store.snapshot(name).await.map_err(|e| {
            error!("Snapshot failed: {}", e);
            DomainError::from(e)
        })?;
        info!("Snapshot created: {}", snapshot.version_name);
        Ok(snapshot)
    }

    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, DomainError> {
        Ok(self.store.list_snapshots().await?)
    }

    async fn acquire_write_gate(&self, op: &'static str) -> Result<SemaphorePermit<'_>, StorageError> {
        match tokio::time::timeout(self.lock_timeout, self.write_gate.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(StorageError::Io("write gate closed".to_string())),
            Err(_) => {
                warn!("Write gate acquire timeout for op={}", op);
                Err(StorageError::LockTimeout)
            }
        }
    }

    /// Load, apply `apply`, save. Nothing is written when `apply` fails.
    async fn mutate<F>(&self, op: &'static str, apply: F) -> Result<OperationOutcome, DomainError>
    where
        F: FnOnce(&mut Catalog) -> Result<OperationOutcome, DomainError>,
    {
        let _permit = self.acquire_write_gate(op).await?;

        let mut catalog = self.load().await?;
        let outcome = apply(&mut catalog)?;

        self.store.save(&catalog).await.map_err(|e| {
            error!("Failed to save menu during {}: {}", op, e);
            DomainError::from(e)
        })?;

        info!(
            "Menu {} succeeded (backend: {}, items: {})",
            op,
            self.store.backend(),
            catalog.item_count()
        );
        Ok(outcome)
    }
}

fn validated_name(raw: &str) -> Result<String, ValidationError> {
    let name = validation::sanitize_name(raw);
    if name.is_empty() {
        warn!("Rejected item: empty name");
        return Err(ValidationError::NameRequired);
    }
    if !validation::is_valid_name(&name) {
        warn!("Rejected item: invalid name '{}'", name);
        return Err(ValidationError::InvalidName);
    }
    Ok(name)
}

fn unique_item_id(catalog: &Catalog, name: &str) -> Result<String, DomainError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = validation::generate_item_id(name);
        if !catalog.contains_item(&candidate) {
            return Ok(candidate);
        }
    }
    Err(DomainError::UnableToGenerateUniqueId)
}
