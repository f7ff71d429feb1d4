//! Target URL extraction.
//!
//! The target is everything after the first occurrence of the mount marker
//! in the inbound path, plus the inbound query string:
//!
//! ```text
//! /proxy/https://example.com/a/b?x=1
//! └─────┘└───────────────────────────┘
//!  marker          target
//! ```

use axum::http::Uri;
use url::Url;

use crate::error::ProxyError;

/// Extract and validate the absolute target URL embedded in `uri`.
pub fn target_url(uri: &Uri, marker: &str) -> Result<Url, ProxyError> {
    let path = uri.path();
    let pos = path
        .find(marker)
        .ok_or_else(|| ProxyError::MissingMarker(marker.to_owned()))?;

    let mut target = path[pos + marker.len()..].to_owned();
    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    let url = Url::parse(&target).map_err(|e| ProxyError::InvalidTarget(format!("{target:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProxyError::InvalidTarget(format!(
            "unsupported scheme {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(uri: &str) -> Result<Url, ProxyError> {
        target_url(&uri.parse().unwrap(), "/proxy/")
    }

    #[test]
    fn extracts_target_after_marker() {
        let url = extract("/proxy/https://example.com/a/b").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a/b");
    }

    #[test]
    fn appends_query_string() {
        let url = extract("/proxy/http://example.com/search?q=rust&page=2").unwrap();
        assert_eq!(url.as_str(), "http://example.com/search?q=rust&page=2");
    }

    #[test]
    fn empty_query_is_dropped() {
        let url = extract("/proxy/http://example.com/x?").unwrap();
        assert_eq!(url.as_str(), "http://example.com/x");
    }

    #[test]
    fn marker_may_follow_a_mount_path() {
        let url = extract("/api/v1/proxy/http://example.com/").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn only_first_marker_counts() {
        let url = extract("/proxy/http://example.com/proxy/inner").unwrap();
        assert_eq!(url.path(), "/proxy/inner");
    }

    #[test]
    fn collapsed_scheme_slashes_still_parse() {
        let url = extract("/proxy/http:/example.com/x").unwrap();
        assert_eq!(url.as_str(), "http://example.com/x");
    }

    #[test]
    fn missing_marker_is_client_error() {
        assert!(matches!(
            extract("/other/http://example.com"),
            Err(ProxyError::MissingMarker(_))
        ));
        assert!(matches!(extract("/proxy"), Err(ProxyError::MissingMarker(_))));
    }

    #[test]
    fn garbage_target_is_construction_error() {
        assert!(matches!(extract("/proxy/"), Err(ProxyError::InvalidTarget(_))));
        assert!(matches!(extract("/proxy/not-a-url"), Err(ProxyError::InvalidTarget(_))));
        assert!(matches!(
            extract("/proxy/ftp://example.com/file"),
            Err(ProxyError::InvalidTarget(_))
        ));
    }
}
