// ============================================================================
// Menu Core - Item Entity
// File: crates/menu-core/src/domain/item.rs
// Description: Purchasable menu entry and its price type
// ============================================================================

use std::fmt;

use menu_shared::constants::{MAX_PRICE_CENTS, MIN_PRICE_CENTS};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

use crate::validation::round_to_cents;

/// Price in whole cents. Serialized as a JSON number with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u32);

impl Price {
    pub fn from_cents(cents: u32) -> Self {
        Price(cents)
    }

    pub fn cents(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn is_within_bounds(&self) -> bool {
        (MIN_PRICE_CENTS..=MAX_PRICE_CENTS).contains(&self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        match round_to_cents(raw) {
            Some(cents) if (0..=i64::from(u32::MAX)).contains(&cents) => Ok(Price(cents as u32)),
            _ => Err(serde::de::Error::custom(format!("invalid price: {}", raw))),
        }
    }
}

/// Menu item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,

    #[validate(length(min = 2, max = 100, message = "Item name must be between 2 and 100 characters"))]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: String,

    pub price: Price,

    #[serde(default = "default_available")]
    pub available: bool,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary: Vec<String>,
}

fn default_available() -> bool {
    true
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Item {
    /// Builds an available item from already-sanitized fields.
    pub fn new(
        id: String,
        name: String,
        description: String,
        price: Price,
        sort_order: i32,
    ) -> Result<Self, validator::ValidationErrors> {
        let item = Self {
            id,
            name,
            description,
            price,
            available: true,
            sort_order,
            dietary: Vec::new(),
        };

        item.validate()?;
        if !item.price.is_within_bounds() {
            let mut errors = validator::ValidationErrors::new();
            errors.add("price", validator::ValidationError::new("range"));
            return Err(errors);
        }
        Ok(item)
    }

    pub fn toggle_availability(&mut self) -> bool {
        self.available = !self.available;
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_item() {
        let item = Item::new(
            "steak-1a2b3c4d".to_string(),
            "Steak".to_string(),
            "Grilled".to_string(),
            Price::from_cents(2500),
            1,
        )
        .unwrap();
        assert!(item.available);
        assert_eq!(item.price.to_string(), "25.00");
    }

    #[test]
    fn test_create_item_rejects_out_of_range_price() {
        let item = Item::new(
            "free-1".to_string(),
            "Free".to_string(),
            String::new(),
            Price::from_cents(0),
            1,
        );
        assert!(item.is_err());
    }

    #[test]
    fn test_price_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_cents(1999)).unwrap();
        assert_eq!(json, "19.99");

        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cents(), 1999);
        assert!(serde_json::from_str::<Price>("-1.5").is_err());
    }

    #[test]
    fn test_item_tolerates_null_description() {
        let item: Item = serde_json::from_str(
            r#"{"id":"soup-1","name":"Soup","description":null,"price":6.5,"available":false}"#,
        )
        .unwrap();
        assert_eq!(item.description, "");
        assert_eq!(item.price.cents(), 650);
        assert!(!item.available);
        assert!(item.dietary.is_empty());
    }
}
