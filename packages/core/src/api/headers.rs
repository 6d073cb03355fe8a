use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::DateTime;

/// Quoted ETag derived from the response bytes.
pub fn compute_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// `Cache-Control: max-age=<secs>`, or `no-store` when nothing is cached.
pub fn cache_control(max_age_secs: u64) -> HeaderValue {
    if max_age_secs == 0 {
        return HeaderValue::from_static("no-store");
    }
    HeaderValue::from_str(&format!("max-age={}", max_age_secs))
        .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
}

/// RFC 7231 HTTP-date for a unix timestamp, if it is representable.
pub fn last_modified(unix_secs: i64) -> Option<HeaderValue> {
    let timestamp = DateTime::from_timestamp(unix_secs, 0)?;
    HeaderValue::from_str(&timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()).ok()
}

/// True when `If-None-Match` lists `*` or the current ETag.
pub fn if_none_match_matches(headers: &HeaderMap, current_etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|raw| raw.split(',').map(str::trim).any(|tag| tag == "*" || tag == current_etag))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_control_reflects_ttl() {
        assert_eq!(cache_control(60), "max-age=60");
        assert_eq!(cache_control(0), "no-store");
    }

    #[test]
    fn last_modified_formats_http_date() {
        let value = last_modified(1_700_000_000).unwrap();
        assert_eq!(value, "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn if_none_match_accepts_listed_tag_or_wildcard() {
        let etag = compute_etag(br#"{"total_cost_usd":0.412}"#);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"other\", {}", etag)).unwrap(),
        );
        assert!(if_none_match_matches(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(if_none_match_matches(&headers, "\"anything\""));

        assert!(!if_none_match_matches(&HeaderMap::new(), &etag));
    }
}
