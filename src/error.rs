//! Proxy-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::client::ExecuteError;
use crate::session::SessionError;

/// Every way a proxied request can fail before the response is committed.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The inbound path does not contain the mount marker.
    #[error("invalid proxy path: missing {0:?} marker")]
    MissingMarker(String),

    /// The embedded target could not be turned into an outbound request.
    #[error("invalid target url: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Upstream(#[from] ExecuteError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingMarker(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidTarget(_) | ProxyError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ProxyError::MissingMarker(_) | ProxyError::InvalidTarget(_) => self.to_string(),
            ProxyError::Session(_) => "Session store unavailable".to_string(),
            ProxyError::Upstream(_) => "Upstream request failed".to_string(),
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ProxyError::MissingMarker("/proxy/".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::InvalidTarget("nope".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::from(SessionError::StoreUnavailable("full".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::from(ExecuteError::TooManyRedirects(10)).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn upstream_details_are_not_sent_to_client() {
        let response = ProxyError::from(ExecuteError::InvalidRedirect("secret".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
