//! Content fingerprinting for deduplication.
//!
//! The fingerprint is the dedup key for stored content: any change to the
//! normalization rules here is a breaking migration of every existing
//! (user_id, content_hash) row.

use sha2::{Digest, Sha256};

/// Query parameters that vary per click but not per document.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "mc_cid",
    "mc_eid",
];

/// Deterministic SHA-256 fingerprint of (normalized url, normalized text).
pub fn fingerprint(url: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_text(text).as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical form of a URL: lowercased scheme/host, no fragment, no tracking
/// params, no trailing slash. Unparseable input falls back to trimmed verbatim.
pub fn normalize_url(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url.trim()) else {
        return url.trim().to_string();
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let clean_pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if clean_pairs.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(clean_pairs);
        }
    }

    let mut out = parsed.to_string();
    while out.ends_with('/') && out.matches('/').count() > 2 {
        out.pop();
    }
    out
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
