//! Application-wide constants

pub const MIN_ITEM_NAME_LENGTH: usize = 2;
pub const MAX_ITEM_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Price bounds, in cents.
pub const MIN_PRICE_CENTS: u32 = 1;
pub const MAX_PRICE_CENTS: u32 = 99_999;

pub const DEFAULT_BACKUP_RETENTION: usize = 5;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 3_600;
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: i64 = 1_800;
pub const DEFAULT_SESSION_ROTATION_SECS: i64 = 300;
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT_SECS: i64 = 900;

/// Upper bound on tracked anonymous sessions (failed logins, lockouts).
pub const MAX_STORED_SESSIONS: usize = 10_000;

pub const SESSION_COOKIE_NAME: &str = "menu_session";
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";
