//! Typed admin operations and their results

use serde::{Deserialize, Serialize};

use crate::domain::Price;
use crate::error::ValidationError;
use crate::repositories::SnapshotInfo;
use crate::validation;

/// A price as submitted: form fields arrive as text, JSON clients may send a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    pub fn validate(&self) -> Result<Price, ValidationError> {
        match self {
            PriceInput::Number(value) => validation::validate_price_value(*value),
            PriceInput::Text(raw) => validation::validate_price(raw),
        }
    }
}

impl From<f64> for PriceInput {
    fn from(value: f64) -> Self {
        PriceInput::Number(value)
    }
}

impl From<&str> for PriceInput {
    fn from(raw: &str) -> Self {
        PriceInput::Text(raw.to_string())
    }
}

impl From<String> for PriceInput {
    fn from(raw: String) -> Self {
        PriceInput::Text(raw)
    }
}

/// Every state-changing operation the admin surface can request.
/// Unknown actions fail to deserialize instead of falling through.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminCommand {
    AddItem {
        category_id: String,
        item_name: String,
        #[serde(default)]
        item_description: String,
        item_price: PriceInput,
    },
    UpdateItem {
        item_id: String,
        item_name: String,
        #[serde(default)]
        item_description: String,
        item_price: PriceInput,
    },
    ToggleAvailability {
        item_id: String,
    },
    DeleteItem {
        item_id: String,
    },
    AddCategory {
        category_name: String,
        #[serde(default)]
        category_description: Option<String>,
    },
    CreateSnapshot {
        #[serde(default)]
        version_name: Option<String>,
    },
}

impl AdminCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::AddItem { .. } => "add_item",
            AdminCommand::UpdateItem { .. } => "update_item",
            AdminCommand::ToggleAvailability { .. } => "toggle_availability",
            AdminCommand::DeleteItem { .. } => "delete_item",
            AdminCommand::AddCategory { .. } => "add_category",
            AdminCommand::CreateSnapshot { .. } => "create_snapshot",
        }
    }
}

/// Successful result of an admin operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotInfo>,
}

impl OperationOutcome {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            item_id: None,
            category_id: None,
            available: None,
            snapshot: None,
        }
    }

    pub fn with_item_id(mut self, item_id: &str) -> Self {
        self.item_id = Some(item_id.to_string());
        self
    }

    pub fn with_category_id(mut self, category_id: &str) -> Self {
        self.category_id = Some(category_id.to_string());
        self
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    pub fn with_snapshot(mut self, snapshot: SnapshotInfo) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}
