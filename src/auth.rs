//! Bearer-token authentication middleware (§6A).
//!
//! Exactly one scheme is supported: a static bearer token checked in
//! constant time against the configured secret. No tenant resolution, no
//! Basic auth, one secret.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let path = request.uri().path();
    if path == "/" || path == "/health" {
        return Ok(next.run(request).await);
    }

    let Some(expected) = config.auth.bearer_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(strip_bearer_prefix);

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        _ => {
            let (status, body) =
                AppError::Unauthorized("authentication required".to_string()).to_response();
            Err((status, body).into_response())
        }
    }
}

fn strip_bearer_prefix(header: &str) -> Option<&str> {
    if header.len() < 7 || !header[..7].eq_ignore_ascii_case("bearer ") {
        return None;
    }
    Some(&header[7..])
}

/// Byte-for-byte comparison whose running time depends only on the length of
/// the two inputs, not on where they first differ — a plain `==` leaks
/// timing information an attacker can use to guess the token one byte at a
/// time — a plain `==` comparison would short-circuit on the first
/// mismatched byte and leak that timing to a patient attacker.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"secret-token", b"secret-token"));
    }

    #[test]
    fn constant_time_eq_rejects_mismatches_and_length_differences() {
        assert!(!constant_time_eq(b"secret-token", b"other-token!"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn strip_bearer_prefix_is_case_insensitive() {
        assert_eq!(strip_bearer_prefix("Bearer abc"), Some("abc"));
        assert_eq!(strip_bearer_prefix("BEARER abc"), Some("abc"));
        assert_eq!(strip_bearer_prefix("Basic abc"), None);
    }
}
