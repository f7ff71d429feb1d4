//! Redirect handling for the upstream client.
//!
//! # Rules
//! - 301/302/303: follow; methods other than GET/HEAD become GET and the
//!   body is dropped
//! - 307/308: follow with the same method and body, unless the body was a
//!   non-empty stream that cannot be sent twice
//! - Other 3xx, missing `Location`: hand the response back unchanged

use axum::http::header::LOCATION;
use axum::http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::client::ExecuteError;
use crate::config::UpstreamConfig;

/// Whether and how far the executor follows redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max_redirects: usize,
}

impl RedirectPolicy {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            follow: config.follow_redirects,
            max_redirects: config.max_redirects,
        }
    }

    pub fn none() -> Self {
        Self {
            follow: false,
            max_redirects: 0,
        }
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::from_config(&UpstreamConfig::default())
    }
}

/// What to do with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
    /// Return the response to the caller as-is.
    Return,
    /// Issue the next hop.
    Follow {
        url: Url,
        method: Method,
        /// `false` when the body must be dropped for the next hop.
        keep_body: bool,
    },
}

impl RedirectPolicy {
    /// Decide the next step for a response to `method current`.
    ///
    /// `has_body` reports whether the original request carried a body that
    /// was already consumed by the previous hop.
    pub fn next_hop(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        method: &Method,
        current: &Url,
        has_body: bool,
    ) -> Result<RedirectAction, ExecuteError> {
        if !self.follow {
            return Ok(RedirectAction::Return);
        }

        let (method, keep_body) = match status {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
                if *method == Method::GET || *method == Method::HEAD {
                    (method.clone(), false)
                } else {
                    (Method::GET, false)
                }
            }
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
                if has_body {
                    return Ok(RedirectAction::Return);
                }
                (method.clone(), true)
            }
            _ => return Ok(RedirectAction::Return),
        };

        let Some(location) = headers.get(LOCATION) else {
            return Ok(RedirectAction::Return);
        };
        let location = location
            .to_str()
            .map_err(|_| ExecuteError::InvalidRedirect("non-ASCII Location header".into()))?;
        let url = current
            .join(location)
            .map_err(|e| ExecuteError::InvalidRedirect(format!("{location}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExecuteError::InvalidRedirect(format!(
                "unsupported scheme in {url}"
            )));
        }

        Ok(RedirectAction::Follow {
            url,
            method,
            keep_body,
        })
    }
}

/// Whether a hop from `from` to `to` leaves the origin (scheme, host and
/// effective port).
pub fn crosses_origin(from: &Url, to: &Url) -> bool {
    from.origin() != to.origin()
}
