// ============================================================================
// Menu Core - Catalog Aggregate
// File: crates/menu-core/src/domain/catalog.rs
// Description: Root of the menu document (categories + items)
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::item::Item;

/// The full menu. Category ids are unique within a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStatistics {
    pub categories: usize,
    pub total_items: usize,
    pub available_items: usize,
    pub by_category: Vec<CategoryStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatistics {
    pub id: String,
    pub name: String,
    pub count: usize,
}

impl Catalog {
    /// Catalog written the first time a store is initialized.
    pub fn with_default_categories() -> Self {
        Self {
            last_updated: Utc::now(),
            categories: vec![
                Category::new("mains", "Main Courses", None, 1),
                Category::new("sides", "Sides & Appetizers", None, 2),
                Category::new("desserts", "Desserts", None, 3),
            ],
        }
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_mut(&mut self, id: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    pub fn active_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.active)
    }

    pub fn find_item(&self, item_id: &str) -> Option<(&Category, &Item)> {
        self.categories.iter().find_map(|c| {
            c.items.iter().find(|i| i.id == item_id).map(|i| (c, i))
        })
    }

    pub fn find_item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.categories
            .iter_mut()
            .flat_map(|c| c.items.iter_mut())
            .find(|i| i.id == item_id)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.find_item(item_id).is_some()
    }

    /// Removes an item, keeping its siblings in their relative order.
    pub fn remove_item(&mut self, item_id: &str) -> Option<Item> {
        for category in &mut self.categories {
            if let Some(pos) = category.items.iter().position(|i| i.id == item_id) {
                return Some(category.items.remove(pos));
            }
        }
        None
    }

    pub fn next_category_sort_order(&self) -> i32 {
        self.categories.iter().map(|c| c.sort_order).max().unwrap_or(0) + 1
    }

    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    /// What the public site shows: active categories with at least one
    /// available item, and only their available items.
    pub fn public_view(&self) -> Catalog {
        let categories = self
            .active_categories()
            .filter_map(|c| {
                let items: Vec<Item> = c.available_items().cloned().collect();
                if items.is_empty() {
                    return None;
                }
                Some(Category {
                    items,
                    ..c.clone()
                })
            })
            .collect();

        Catalog {
            last_updated: self.last_updated,
            categories,
        }
    }

    pub fn statistics(&self) -> CatalogStatistics {
        let active: Vec<&Category> = self.active_categories().collect();
        CatalogStatistics {
            categories: active.len(),
            total_items: active.iter().map(|c| c.items.len()).sum(),
            available_items: active.iter().map(|c| c.available_items().count()).sum(),
            by_category: active
                .iter()
                .map(|c| CategoryStatistics {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    count: c.items.len(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Price;

    fn item(id: &str, available: bool, sort_order: i32) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            price: Price::from_cents(500),
            available,
            sort_order,
            dietary: Vec::new(),
        }
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::with_default_categories();
        let mains = catalog.category_mut("mains").unwrap();
        mains.items = vec![item("steak", true, 1), item("fish", false, 2), item("pie", true, 3)];
        let sides = catalog.category_mut("sides").unwrap();
        sides.items = vec![item("chips", false, 1)];
        catalog
    }

    #[test]
    fn test_remove_item_keeps_sibling_order() {
        let mut catalog = sample();
        let removed = catalog.remove_item("fish").unwrap();
        assert_eq!(removed.id, "fish");

        let ids: Vec<_> = catalog.category("mains").unwrap().items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["steak", "pie"]);
        assert!(catalog.remove_item("fish").is_none());
    }

    #[test]
    fn test_public_view_hides_unavailable() {
        let catalog = sample();
        let public = catalog.public_view();

        assert_eq!(public.categories.len(), 1);
        let mains = &public.categories[0];
        assert_eq!(mains.id, "mains");
        assert!(mains.items.iter().all(|i| i.available));
        assert_eq!(mains.items.len(), 2);
    }

    #[test]
    fn test_statistics() {
        let stats = sample().statistics();
        assert_eq!(stats.categories, 3);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.available_items, 2);
        assert_eq!(stats.by_category[0].count, 3);
    }

    #[test]
    fn test_document_round_trip() {
        let catalog = sample();
        let json = serde_json::to_string_pretty(&catalog).unwrap();
        assert!(json.contains("\"lastUpdated\""));
        assert!(json.contains("\"sortOrder\""));

        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn test_legacy_document_loads_with_defaults() {
        let json = r#"{
            "lastUpdated": "2024-05-01T10:00:00+00:00",
            "categories": [
                { "id": "mains", "name": "Main Courses", "items": [
                    { "id": "steak-abc123", "name": "Steak", "description": "Grilled", "price": 25, "available": true }
                ] }
            ]
        }"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        let mains = catalog.category("mains").unwrap();
        assert!(mains.active);
        assert_eq!(mains.items[0].price.cents(), 2500);
    }
}
