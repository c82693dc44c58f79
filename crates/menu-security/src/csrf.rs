//! Anti-forgery tokens

use rand::Rng;
use subtle::ConstantTimeEq;

pub fn generate_csrf_token() -> String {
    let token: [u8; 32] = rand::rng().random();
    hex::encode(token)
}

/// Constant-time comparison; an empty token never matches.
pub fn validate_csrf_token(token: &str, expected: &str) -> bool {
    if token.is_empty() || expected.is_empty() {
        return false;
    }
    token.as_bytes().ct_eq(expected.as_bytes()).into()
}
