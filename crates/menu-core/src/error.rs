//! Domain errors

use thiserror::Error;

/// Rejected input. Expected during normal operation, never touches storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Item name is required")]
    NameRequired,

    #[error("Invalid item name")]
    InvalidName,

    #[error("Invalid price")]
    InvalidPrice,

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid category name")]
    InvalidCategoryName,

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),
}

/// Failures of the durable catalog. Never retried by the core.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Menu data not found")]
    NotFound,

    #[error("Stored menu is corrupt: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Timed out waiting for the menu write lock")]
    LockTimeout,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Unable to generate unique item id")]
    UnableToGenerateUniqueId,
}

impl DomainError {
    /// Message safe to show an operator. Storage detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            DomainError::Validation(e) => e.to_string(),
            DomainError::ItemNotFound(_) => "Item not found".to_string(),
            DomainError::CategoryNotFound(_) => "Category not found".to_string(),
            DomainError::Storage(StorageError::NotFound) => "Menu data not found".to_string(),
            DomainError::Storage(StorageError::LockTimeout) => {
                "Menu is busy, please try again".to_string()
            }
            DomainError::Storage(StorageError::Corrupt(_)) => "Failed to load menu".to_string(),
            DomainError::Storage(_) => "Failed to save menu".to_string(),
            DomainError::UnableToGenerateUniqueId => "Failed to create item".to_string(),
        }
    }
}
