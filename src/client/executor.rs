//! The execution capability the forwarding handler depends on.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

use crate::session::SharedCookieStore;

/// Errors from executing an outbound request.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// DNS, connect, TLS, timeout or protocol failure.
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("invalid redirect location: {0}")]
    InvalidRedirect(String),

    #[error("invalid outbound url: {0}")]
    InvalidUrl(String),
}

impl ExecuteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecuteError::Request(e) if e.is_timeout())
    }
}

/// Sends one outbound request on behalf of a session.
///
/// Implementations own transport, timeout and redirect policy. They must
/// replay cookies from `cookies` on every hop and record every
/// `Set-Cookie` they receive into it.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        request: Request<Body>,
        cookies: SharedCookieStore,
    ) -> Result<Response<Body>, ExecuteError>;
}
