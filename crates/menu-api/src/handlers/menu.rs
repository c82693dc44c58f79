// ============================================================================
// Menu API - Read Handlers
// File: crates/menu-api/src/handlers/menu.rs
// ============================================================================
//! Public read API. No session required.

use axum::{extract::State, Json};
use menu_core::{Catalog, DomainError, StorageError};

use crate::error::ApiError;
use crate::state::AppState;

fn read_error(e: DomainError) -> ApiError {
    match e {
        DomainError::Storage(StorageError::NotFound) => {
            ApiError::NotFound("Menu data not found".to_string())
        }
        DomainError::Storage(_) => ApiError::InternalError("Failed to load menu".to_string()),
        other => ApiError::from(other),
    }
}

/// Full catalog - GET /api/menu
pub async fn get_menu(State(state): State<AppState>) -> Result<Json<Catalog>, ApiError> {
    state.menu.load().await.map(Json).map_err(read_error)
}

/// What the public site renders - GET /api/menu/public
pub async fn get_public_menu(State(state): State<AppState>) -> Result<Json<Catalog>, ApiError> {
    state.menu.public_menu().await.map(Json).map_err(read_error)
}
