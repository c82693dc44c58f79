use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use menu_shared::constants::CSRF_HEADER_NAME;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers::{admin, health, menu};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Read API (no session)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/menu", get(menu::get_menu))
        .route("/api/menu/public", get(menu::get_public_menu));

    // Admin API (session + anti-forgery token on mutations)
    let admin_routes = Router::new()
        .route("/admin/login", post(admin::login))
        .route("/admin/logout", post(admin::logout))
        .route("/admin/session", get(admin::session))
        .route("/admin/menu", post(admin::execute))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/categories", get(admin::categories))
        .route("/admin/snapshots", get(admin::snapshots));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
        // CORS
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    HeaderName::from_static(CSRF_HEADER_NAME),
                ]),
        )
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
