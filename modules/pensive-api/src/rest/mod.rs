pub mod concepts;
pub mod content;
pub mod cron;
pub mod digests;
pub mod feeds;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

/// JSON error body with a status code.
pub(crate) fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

/// The acting user, from the x-user-id header. Auth flows live in front of
/// this service; the header is the boundary.
pub(crate) fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, Response> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error_json(StatusCode::BAD_REQUEST, "x-user-id header is required"))?;

    Uuid::parse_str(raw)
        .map_err(|_| error_json(StatusCode::BAD_REQUEST, "x-user-id must be a UUID"))
}

/// Validate a submitted URL: length, syntax, scheme, and no private or
/// internal hosts (the server fetches these URLs itself).
pub(crate) fn validate_url(raw: &str) -> Result<String, Response> {
    let url = raw.trim().to_string();
    if url.is_empty() {
        return Err(error_json(StatusCode::BAD_REQUEST, "url is required"));
    }
    if url.len() > 2048 {
        return Err(error_json(
            StatusCode::BAD_REQUEST,
            "URL too long (max 2048 characters)",
        ));
    }

    let parsed = url::Url::parse(&url)
        .map_err(|_| error_json(StatusCode::BAD_REQUEST, "Invalid URL"))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(error_json(
            StatusCode::BAD_REQUEST,
            "URL must use http or https scheme",
        ));
    }

    if let Some(host) = parsed.host_str() {
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if is_private_ip(ip) {
                return Err(error_json(
                    StatusCode::BAD_REQUEST,
                    "URLs pointing to private addresses are not allowed",
                ));
            }
        }
        let lower = host.to_lowercase();
        if lower == "localhost" || lower.ends_with(".local") || lower.ends_with(".internal") {
            return Err(error_json(
                StatusCode::BAD_REQUEST,
                "URLs pointing to internal hosts are not allowed",
            ));
        }
    }

    Ok(url)
}

/// Check if an IP address is loopback, link-local, or in a private range.
fn is_private_ip(ip: std::net::IpAddr) -> bool {
    match ip {
        std::net::IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_link_local()
                || v4.octets()[0] == 10
                || (v4.octets()[0] == 172 && (16..=31).contains(&v4.octets()[1]))
                || (v4.octets()[0] == 192 && v4.octets()[1] == 168)
        }
        std::net::IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_id_parses_uuid_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(user_id_from_headers(&headers).unwrap(), id);
    }

    #[test]
    fn user_id_rejects_missing_and_malformed() {
        assert!(user_id_from_headers(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        assert!(user_id_from_headers(&headers).is_err());
    }

    #[test]
    fn validate_url_accepts_https() {
        assert!(validate_url("https://example.com/article").is_ok());
        assert_eq!(
            validate_url("  https://example.com/a  ").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn validate_url_rejects_bad_input() {
        assert!(validate_url("").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url(&format!("https://example.com/{}", "a".repeat(2048))).is_err());
    }

    #[test]
    fn validate_url_blocks_internal_targets() {
        assert!(validate_url("http://localhost/admin").is_err());
        assert!(validate_url("http://127.0.0.1/").is_err());
        assert!(validate_url("http://10.0.0.5/secrets").is_err());
        assert!(validate_url("http://192.168.1.1/").is_err());
        assert!(validate_url("http://service.internal/").is_err());
    }
}
