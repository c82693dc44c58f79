//! Admin session guard
//!
//! All session data lives in an explicit [`SessionState`] owned by the
//! caller (one per browser session). The guard holds only the credentials,
//! the timing policy and a clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use menu_shared::config::AdminSettings;
use menu_shared::constants::{
    DEFAULT_INACTIVITY_TIMEOUT_SECS, DEFAULT_LOCKOUT_SECS, DEFAULT_MAX_LOGIN_ATTEMPTS,
    DEFAULT_SESSION_ROTATION_SECS, DEFAULT_SESSION_TIMEOUT_SECS,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::csrf;
use crate::password::{PasswordError, PasswordService};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Session expired")]
    SessionExpired,
    #[error("Invalid username or password")]
    InvalidCredentials { remaining_attempts: u32 },
    #[error("Too many failed attempts. Try again in {remaining_secs} seconds")]
    Locked { remaining_secs: i64 },
    #[error("Invalid security token")]
    InvalidCsrfToken,
    #[error("Credential check failed: {0}")]
    Hash(String),
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        AuthError::Hash(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    Expired,
    LockedOut,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub session_timeout: Duration,
    pub inactivity_timeout: Duration,
    pub rotation_interval: Duration,
    pub max_failed_attempts: u32,
    pub lockout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            session_timeout: Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS),
            inactivity_timeout: Duration::seconds(DEFAULT_INACTIVITY_TIMEOUT_SECS),
            rotation_interval: Duration::seconds(DEFAULT_SESSION_ROTATION_SECS),
            max_failed_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            lockout: Duration::seconds(DEFAULT_LOCKOUT_SECS),
        }
    }
}

impl From<&AdminSettings> for SessionPolicy {
    fn from(settings: &AdminSettings) -> Self {
        Self {
            session_timeout: Duration::seconds(settings.session_timeout_secs),
            inactivity_timeout: Duration::seconds(settings.inactivity_timeout_secs),
            rotation_interval: Duration::seconds(settings.rotation_interval_secs),
            max_failed_attempts: settings.max_login_attempts.max(1),
            lockout: Duration::seconds(settings.lockout_secs),
        }
    }
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password_hash: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Per-session data.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub username: Option<String>,
    authenticated: bool,
    login_at: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
    rotated_at: Option<DateTime<Utc>>,
    csrf_token: Option<String>,
    failed_attempts: u32,
    last_failure_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: new_session_id(),
            username: None,
            authenticated: false,
            login_at: None,
            last_activity: None,
            rotated_at: None,
            csrf_token: None,
            failed_attempts: 0,
            last_failure_at: None,
            locked_until: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    fn rotate_id(&mut self, now: DateTime<Utc>) {
        self.id = new_session_id();
        self.rotated_at = Some(now);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct SessionGuard {
    credentials: AdminCredentials,
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
}

impl SessionGuard {
    pub fn new(credentials: AdminCredentials, policy: SessionPolicy) -> Self {
        Self::with_clock(credentials, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        credentials: AdminCredentials,
        policy: SessionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn authenticate(
        &self,
        state: &mut SessionState,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();

        if let Some(until) = state.locked_until {
            if now < until {
                warn!("Login rejected: session locked out");
                return Err(AuthError::Locked {
                    remaining_secs: remaining_secs(until, now),
                });
            }
            state.locked_until = None;
            state.failed_attempts = 0;
        }

        let username_ok: bool = username
            .as_bytes()
            .ct_eq(self.credentials.username.as_bytes())
            .into();
        // Always run the hash check so a wrong username costs the same time.
        let password_ok = PasswordService::verify(password, &self.credentials.password_hash)?;

        if username_ok && password_ok {
            state.failed_attempts = 0;
            state.last_failure_at = None;
            state.locked_until = None;
            state.authenticated = true;
            state.username = Some(username.to_string());
            state.login_at = Some(now);
            state.last_activity = Some(now);
            state.rotate_id(now);
            state.csrf_token = Some(csrf::generate_csrf_token());
            info!("Admin login succeeded for '{}'", username);
            return Ok(());
        }

        state.failed_attempts += 1;
        state.last_failure_at = Some(now);
        if state.failed_attempts >= self.policy.max_failed_attempts {
            let until = now + self.policy.lockout;
            state.locked_until = Some(until);
            warn!(
                "Admin login locked out after {} failed attempts",
                state.failed_attempts
            );
            // A lockout also ends any login this session already held.
            self.destroy(state);
            return Err(AuthError::Locked {
                remaining_secs: remaining_secs(until, now),
            });
        }

        warn!(
            "Admin login failed ({} of {})",
            state.failed_attempts, self.policy.max_failed_attempts
        );
        Err(AuthError::InvalidCredentials {
            remaining_attempts: self.policy.max_failed_attempts - state.failed_attempts,
        })
    }

    /// Checks the session and refreshes its activity stamp. An expired
    /// session is destroyed before returning.
    pub fn authorize(&self, state: &mut SessionState) -> Result<(), AuthError> {
        if !state.authenticated {
            return Err(AuthError::NotAuthenticated);
        }

        let now = self.clock.now();
        if self.is_expired(state, now) {
            info!("Admin session expired");
            self.destroy(state);
            return Err(AuthError::SessionExpired);
        }

        state.last_activity = Some(now);
        let rotate = state
            .rotated_at
            .map_or(true, |at| now - at >= self.policy.rotation_interval);
        if rotate {
            state.rotate_id(now);
        }
        Ok(())
    }

    /// Returns the session's anti-forgery token, creating one if needed.
    pub fn issue_csrf_token(&self, state: &mut SessionState) -> String {
        state
            .csrf_token
            .get_or_insert_with(csrf::generate_csrf_token)
            .clone()
    }

    pub fn verify_csrf_token(&self, state: &SessionState, token: &str) -> bool {
        state
            .csrf_token
            .as_deref()
            .is_some_and(|expected| csrf::validate_csrf_token(token, expected))
    }

    /// Gate for every state-changing admin request.
    pub fn authorize_mutation(
        &self,
        state: &mut SessionState,
        token: Option<&str>,
    ) -> Result<(), AuthError> {
        self.authorize(state)?;
        match token {
            Some(token) if self.verify_csrf_token(state, token) => Ok(()),
            _ => {
                warn!("Admin mutation rejected: invalid anti-forgery token");
                Err(AuthError::InvalidCsrfToken)
            }
        }
    }

    /// Logs out. Failed-attempt tracking survives only while a lockout is
    /// still running.
    pub fn destroy(&self, state: &mut SessionState) {
        let now = self.clock.now();
        let lockout = state.locked_until.filter(|until| now < *until);
        let failed_attempts = if lockout.is_some() {
            state.failed_attempts
        } else {
            0
        };

        let last_failure_at = lockout.and(state.last_failure_at);

        *state = SessionState::new();
        state.locked_until = lockout;
        state.failed_attempts = failed_attempts;
        state.last_failure_at = last_failure_at;
    }

    /// True when a session holds nothing worth keeping: an expired login, or
    /// failed attempts with no running lockout that have sat idle past the
    /// inactivity timeout.
    pub fn is_stale(&self, state: &SessionState) -> bool {
        let now = self.clock.now();
        if state.authenticated {
            return self.is_expired(state, now);
        }
        if state.locked_until.is_some_and(|until| now < until) {
            return false;
        }
        state
            .last_failure_at
            .map_or(true, |at| now - at >= self.policy.inactivity_timeout)
    }

    pub fn status(&self, state: &SessionState) -> SessionStatus {
        let now = self.clock.now();
        if state.authenticated {
            if self.is_expired(state, now) {
                SessionStatus::Expired
            } else {
                SessionStatus::Authenticated
            }
        } else if state.locked_until.is_some_and(|until| now < until) {
            SessionStatus::LockedOut
        } else {
            SessionStatus::Anonymous
        }
    }

    fn is_expired(&self, state: &SessionState, now: DateTime<Utc>) -> bool {
        let session_over = state
            .login_at
            .map_or(true, |at| now - at >= self.policy.session_timeout);
        let idle_over = state
            .last_activity
            .map_or(true, |at| now - at >= self.policy.inactivity_timeout);
        session_over || idle_over
    }
}

fn remaining_secs(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = until - now;
    let secs = remaining.num_seconds();
    if remaining > Duration::seconds(secs) {
        secs + 1
    } else {
        secs.max(1)
    }
}
