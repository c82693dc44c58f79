use std::sync::Arc;

use menu_core::MenuService;
use menu_security::SessionGuard;

use crate::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub menu: Arc<MenuService>,
    pub guard: Arc<SessionGuard>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(menu: Arc<MenuService>, guard: Arc<SessionGuard>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(guard.clone())),
            menu,
            guard,
        }
    }
}
