use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check - GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "storage": state.menu.backend().as_str(),
    }))
}
