// ============================================================================
// Menu Core - Category Entity
// File: crates/menu-core/src/domain/category.rs
// Description: Named, ordered grouping that owns its items
// ============================================================================

use serde::{Deserialize, Serialize};

use super::item::Item;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Slug, immutable once created.
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub items: Vec<Item>,
}

fn default_active() -> bool {
    true
}

/// Category without its items, for admin drop-downs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sort_order: i32,
}

impl Category {
    pub fn new(id: &str, name: &str, description: Option<String>, sort_order: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description,
            sort_order,
            active: true,
            items: Vec::new(),
        }
    }

    /// Sort order for an item appended at the end of this category.
    pub fn next_item_sort_order(&self) -> i32 {
        self.items.iter().map(|i| i.sort_order).max().unwrap_or(0) + 1
    }

    pub fn available_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.available)
    }

    pub fn info(&self) -> CategoryInfo {
        CategoryInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            sort_order: self.sort_order,
        }
    }
}
