// Bearer-token gate for the /cron routes. The token is a shared secret
// from CRON_SECRET, compared in constant time.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

/// Check the Authorization header against the cron secret. Returns the 401
/// response to send when the check fails.
pub fn require_cron_auth(headers: &HeaderMap, secret: &str) -> Result<(), Response> {
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), secret.as_bytes()) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Unauthorized"})),
        )
            .into_response()),
    }
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_correct_token() {
        let headers = headers_with("Bearer s3cret");
        assert!(require_cron_auth(&headers, "s3cret").is_ok());
    }

    #[test]
    fn rejects_wrong_token() {
        let headers = headers_with("Bearer nope");
        assert!(require_cron_auth(&headers, "s3cret").is_err());
    }

    #[test]
    fn rejects_missing_header() {
        assert!(require_cron_auth(&HeaderMap::new(), "s3cret").is_err());
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let headers = headers_with("Basic s3cret");
        assert!(require_cron_auth(&headers, "s3cret").is_err());
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
