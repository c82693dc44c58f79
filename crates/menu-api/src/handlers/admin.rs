// ============================================================================
// Menu API - Admin Handlers
// File: crates/menu-api/src/handlers/admin.rs
// ============================================================================
//! Session-guarded admin API (login, logout, menu commands, stats)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use menu_core::{AdminCommand, CatalogStatistics, CategoryInfo, OperationOutcome, SnapshotInfo};
use menu_security::{SessionState, SessionStatus};
use menu_shared::constants::CSRF_HEADER_NAME;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::session_store::OpenSession;
use crate::state::AppState;

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub csrf_token: String,
    pub username: Option<String>,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: OperationOutcome,
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategoryInfo>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotList {
    pub snapshots: Vec<SnapshotInfo>,
}

/// Puts the session back and attaches its cookie when the id changed.
fn finish<T: IntoResponse>(state: &AppState, session: OpenSession, result: Result<T, ApiError>) -> Response {
    let cookie = state.sessions.commit(session);
    let mut response = match result {
        Ok(body) => body.into_response(),
        Err(e) => e.into_response(),
    };
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

fn csrf_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(CSRF_HEADER_NAME).and_then(|v| v.to_str().ok())
}

fn session_info(state: &AppState, session: &mut SessionState) -> SessionInfo {
    SessionInfo {
        csrf_token: state.guard.issue_csrf_token(session),
        username: session.username.clone(),
        status: state.guard.status(session),
    }
}

/// Login handler - POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let mut session = state.sessions.open(&headers);

    let request = match payload {
        Ok(Json(request)) if !request.username.trim().is_empty() && !request.password.is_empty() => {
            request
        }
        _ => {
            let error = ApiError::BadRequest("Username and password are required".to_string());
            return finish(&state, session, Err::<Response, _>(error));
        }
    };

    // Argon2 verification is CPU-bound; keep it off the async workers.
    let guard = state.guard.clone();
    let session_state = session.state.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let mut session_state = session_state;
        let result = guard.authenticate(&mut session_state, request.username.trim(), &request.password);
        (session_state, result)
    })
    .await;

    let result = match joined {
        Ok((session_state, result)) => {
            session.state = session_state;
            result
                .map(|()| {
                    Json(ApiResponse::success(
                        "Login successful",
                        session_info(&state, &mut session.state),
                    ))
                })
                .map_err(ApiError::from)
        }
        Err(e) => {
            error!("Login task failed: {}", e);
            Err(ApiError::InternalError("Login is unavailable".to_string()))
        }
    };
    finish(&state, session, result)
}

/// Logout handler - POST /admin/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut session = state.sessions.open(&headers);
    if session.state.is_authenticated() {
        info!("Admin logged out");
    }
    state.guard.destroy(&mut session.state);
    finish(&state, session, Ok::<_, ApiError>(Json(ApiResponse::message("Logged out successfully"))))
}

/// Current session and its anti-forgery token - GET /admin/session
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut session = state.sessions.open(&headers);
    let result = state
        .guard
        .authorize(&mut session.state)
        .map(|()| Json(ApiResponse::success("Session active", session_info(&state, &mut session.state))))
        .map_err(ApiError::from);
    finish(&state, session, result)
}

/// Menu mutation - POST /admin/menu with a JSON command tagged by `action`
pub async fn execute(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AdminCommand>, JsonRejection>,
) -> Response {
    let mut session = state.sessions.open(&headers);

    if let Err(e) = state
        .guard
        .authorize_mutation(&mut session.state, csrf_header(&headers))
    {
        return finish(&state, session, Err::<Response, _>(ApiError::from(e)));
    }

    let command = match payload {
        Ok(Json(command)) => command,
        Err(rejection) => {
            warn!("Rejected admin command: {}", rejection.body_text());
            let error = ApiError::BadRequest("Invalid action".to_string());
            return finish(&state, session, Err::<Response, _>(error));
        }
    };

    let result = state
        .menu
        .execute(command)
        .await
        .map(|outcome| Json(CommandResponse { success: true, outcome }))
        .map_err(ApiError::from);
    finish(&state, session, result)
}

/// Read-only admin views share this gate: a valid session, no token.
async fn authorized_read<T, F, Fut>(state: &AppState, headers: &HeaderMap, read: F) -> Response
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(String, T), ApiError>>,
{
    let mut session = state.sessions.open(headers);
    let result = match state.guard.authorize(&mut session.state) {
        Ok(()) => read()
            .await
            .map(|(message, data)| Json(ApiResponse::success(message, data))),
        Err(e) => Err(ApiError::from(e)),
    };
    finish(state, session, result)
}

/// Catalog statistics - GET /admin/stats
pub async fn stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let menu = state.menu.clone();
    authorized_read(&state, &headers, || async move {
        let stats: CatalogStatistics = menu.statistics().await?;
        Ok(("Statistics loaded".to_string(), stats))
    })
    .await
}

/// Active categories for the item form - GET /admin/categories
pub async fn categories(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let menu = state.menu.clone();
    authorized_read(&state, &headers, || async move {
        let categories = menu.categories().await?;
        Ok(("Categories loaded".to_string(), CategoryList { categories }))
    })
    .await
}

/// Named snapshots, newest first - GET /admin/snapshots
pub async fn snapshots(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let menu = state.menu.clone();
    authorized_read(&state, &headers, || async move {
        let snapshots = menu.list_snapshots().await?;
        Ok(("Snapshots loaded".to_string(), SnapshotList { snapshots }))
    })
    .await
}
