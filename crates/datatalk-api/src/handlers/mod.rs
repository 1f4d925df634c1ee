pub mod ai;
pub mod chat;
pub mod datasets;
pub mod health;
pub mod queries;
pub mod reports;

use axum::http::HeaderMap;

/// Resolve a tri-state mode flag: an explicit body value wins, then the
/// `X-<Mode>: on|off` header, then the default.
pub(crate) fn resolve_flag(body_value: Option<bool>, headers: &HeaderMap, header_name: &str, default: bool) -> bool {
    if let Some(value) = body_value {
        return value;
    }
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn body_value_takes_precedence_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-safe-mode", HeaderValue::from_static("on"));
        assert!(!resolve_flag(Some(false), &headers, "x-safe-mode", false));
    }

    #[test]
    fn header_is_used_when_body_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("x-safe-mode", HeaderValue::from_static("on"));
        assert!(resolve_flag(None, &headers, "x-safe-mode", false));
    }

    #[test]
    fn default_applies_when_neither_is_present() {
        let headers = HeaderMap::new();
        assert!(resolve_flag(None, &headers, "x-privacy-mode", true));
    }
}
