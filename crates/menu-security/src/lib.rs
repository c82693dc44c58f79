//! # Menu Security
//!
//! Security utilities: password hashing, anti-forgery tokens, admin session guard.

pub mod password;
pub mod session;
pub mod csrf;

pub use password::{PasswordError, PasswordService};
pub use session::{
    AdminCredentials, AuthError, Clock, SessionGuard, SessionPolicy, SessionState, SessionStatus,
    SystemClock,
};
