//! Per-session cookie stores.
//!
//! The proxy never inspects cookies itself. It only mints one empty store
//! per session and hands it to the executor, which records `Set-Cookie`
//! headers into it and replays matching cookies (RFC 6265 domain/path
//! rules) on later requests.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};

use crate::session::SessionError;

/// A cookie store owned by exactly one session.
pub type SharedCookieStore = Arc<dyn CookieStore>;

/// Mints a fresh, empty cookie store for a new session.
pub trait CookieStoreFactory: Send + Sync {
    fn create(&self) -> Result<SharedCookieStore, SessionError>;
}

/// In-memory [`Jar`] per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct JarFactory;

impl CookieStoreFactory for JarFactory {
    fn create(&self) -> Result<SharedCookieStore, SessionError> {
        Ok(Arc::new(Jar::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use url::Url;

    #[test]
    fn jars_are_independent() {
        let url = Url::parse("http://example.com/").unwrap();
        let a = JarFactory.create().unwrap();
        let b = JarFactory.create().unwrap();

        let set = HeaderValue::from_static("token=a; Path=/");
        a.set_cookies(&mut std::iter::once(&set), &url);

        assert_eq!(a.cookies(&url).unwrap(), "token=a");
        assert!(b.cookies(&url).is_none());
    }
}
