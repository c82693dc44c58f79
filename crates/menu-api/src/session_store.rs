//! In-memory admin sessions, keyed by the id in the session cookie

use std::sync::Arc;

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use dashmap::DashMap;
use menu_security::{SessionGuard, SessionState};
use menu_shared::constants::{MAX_STORED_SESSIONS, SESSION_COOKIE_NAME};
use tracing::{debug, warn};

/// A session taken out of the store for the length of one request.
pub struct OpenSession {
    previous_id: Option<String>,
    pub state: SessionState,
}

pub struct SessionStore {
    sessions: DashMap<String, SessionState>,
    guard: Arc<SessionGuard>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(guard: Arc<SessionGuard>) -> Self {
        Self::with_capacity(guard, MAX_STORED_SESSIONS)
    }

    pub fn with_capacity(guard: Arc<SessionGuard>, capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            guard,
            capacity,
        }
    }

    /// The session named by the request cookie, or a fresh anonymous one.
    pub fn open(&self, headers: &HeaderMap) -> OpenSession {
        let previous_id = session_id(headers);
        let state = previous_id
            .as_deref()
            .and_then(|id| self.sessions.get(id).map(|s| s.value().clone()))
            .unwrap_or_default();
        OpenSession { previous_id, state }
    }

    /// Writes the session back and returns the cookie to send when the id
    /// changed. Sessions with nothing worth keeping are dropped.
    pub fn commit(&self, session: OpenSession) -> Option<HeaderValue> {
        let OpenSession { previous_id, state } = session;
        if let Some(previous) = previous_id.as_deref() {
            if previous != state.id {
                self.sessions.remove(previous);
                debug!("Session id rotated");
            }
        }

        let keep = state.is_authenticated() || state.failed_attempts() > 0;
        if !keep {
            self.sessions.remove(&state.id);
            return previous_id.map(|_| expired_cookie());
        }

        if !self.sessions.contains_key(&state.id) && self.sessions.len() >= self.capacity {
            self.sweep();
            // Logins always get a slot; anonymous failures wait for room.
            if self.sessions.len() >= self.capacity && !state.is_authenticated() {
                warn!("Session table full, not tracking anonymous session");
                return previous_id.map(|_| expired_cookie());
            }
        }

        let changed = previous_id.as_deref() != Some(state.id.as_str());
        let cookie = changed.then(|| session_cookie(&state.id)).flatten();
        self.sessions.insert(state.id.clone(), state);
        cookie
    }

    /// Drops expired logins and failure records that have gone idle.
    pub fn sweep(&self) {
        let before = self.sessions.len();
        self.sessions.retain(|_, state| !self.guard.is_stale(state));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!("Swept {} stale sessions", removed);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict",
        SESSION_COOKIE_NAME, id
    ))
    .ok()
}

fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("menu_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    use chrono::{DateTime, Duration, Utc};
    use menu_security::{AdminCredentials, Clock, PasswordService, SessionPolicy};

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now = *now + Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn guard() -> (Arc<SessionGuard>, Arc<ManualClock>) {
        static HASH: OnceLock<String> = OnceLock::new();
        let hash = HASH.get_or_init(|| PasswordService::hash("s3cret-pass").unwrap());
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let guard = SessionGuard::with_clock(
            AdminCredentials {
                username: "admin".to_string(),
                password_hash: hash.clone(),
            },
            SessionPolicy::default(),
            clock.clone(),
        );
        (Arc::new(guard), clock)
    }

    /// A login attempt from a client that sends no cookie.
    fn cookieless_login(store: &SessionStore, guard: &SessionGuard, password: &str) -> Option<HeaderValue> {
        let mut session = store.open(&HeaderMap::new());
        let _ = guard.authenticate(&mut session.state, "admin", password);
        store.commit(session)
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let headers = headers_with("theme=dark; menu_session=abc123; lang=en");
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));
        assert_eq!(session_id(&HeaderMap::new()), None);
        assert_eq!(session_id(&headers_with("menu_session=")), None);
    }

    #[test]
    fn test_cookieless_failures_are_bounded() {
        let (guard, _) = guard();
        let store = SessionStore::with_capacity(guard.clone(), 10);

        for _ in 0..25 {
            cookieless_login(&store, &guard, "wrong");
        }
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_idle_failures_are_swept_when_full() {
        let (guard, clock) = guard();
        let store = SessionStore::with_capacity(guard.clone(), 4);

        for _ in 0..4 {
            cookieless_login(&store, &guard, "wrong");
        }
        clock.advance(1_800);
        assert!(cookieless_login(&store, &guard, "wrong").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_login_gets_a_slot_when_full() {
        let (guard, _) = guard();
        let store = SessionStore::with_capacity(guard.clone(), 2);

        cookieless_login(&store, &guard, "wrong");
        cookieless_login(&store, &guard, "wrong");
        assert!(cookieless_login(&store, &guard, "s3cret-pass").is_some());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_anonymous_sessions_are_not_stored() {
        let (guard, _) = guard();
        let store = SessionStore::new(guard);
        let session = store.open(&HeaderMap::new());
        assert!(store.commit(session).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_cookie_matches_session_cookie_name() {
        let value = expired_cookie();
        assert!(value.to_str().unwrap().starts_with(&format!("{}=", SESSION_COOKIE_NAME)));
    }
}
