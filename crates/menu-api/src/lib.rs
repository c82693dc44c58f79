//! # Menu API
//!
//! HTTP surface over the menu service: the public read API and the
//! session-guarded admin API.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod session_store;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
