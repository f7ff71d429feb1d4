//! Forwarding handler.
//!
//! # Flow
//! ```text
//! inbound request
//!     → target.rs (marker → absolute target URL)
//!     → headers.rs (outbound header set)
//!     → SessionManager (session id + its cookie store)
//!     → Executor (one outbound request/response cycle)
//!     → headers.rs (drop Set-Cookie) → stream body back
//!     → session cookie appended when newly issued, success or not
//! ```
//!
//! The handler is stateless per request. Redirect policy, timeouts and
//! transport belong to the executor.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, Request, Response};
use axum::response::IntoResponse;
use futures_util::TryStreamExt;
use url::Url;

use crate::error::ProxyError;
use crate::http::headers::{filter_response_headers, forwarded_request_headers};
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::http::target::target_url;
use crate::observability::metrics;
use crate::session::SessionId;

/// Axum entry point for every proxied request.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let request_id = request_id(request.headers()).to_string();

    let Forwarded { set_cookie, result } = forward(&state, request).await;
    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ProxyError::MissingMarker(_) => {
                    tracing::debug!(request_id = %request_id, error = %e, "Rejected malformed proxy path");
                }
                ProxyError::InvalidTarget(_) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Invalid target");
                }
                ProxyError::Session(_) => {
                    tracing::error!(request_id = %request_id, error = %e, "Session store unavailable");
                }
                ProxyError::Upstream(err) => {
                    tracing::warn!(
                        request_id = %request_id,
                        error = %e,
                        timeout = err.is_timeout(),
                        "Upstream error"
                    );
                }
            }
            e.into_response()
        }
    };

    // A newly issued identifier goes out on errors too, so a retry reuses
    // the session instead of minting another.
    if let Some(cookie) = set_cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

/// Outcome of [`forward`].
pub struct Forwarded {
    /// Session cookie to hand the client, when one was issued.
    pub set_cookie: Option<HeaderValue>,
    pub result: Result<Response<Body>, ProxyError>,
}

/// Forward one inbound request to its embedded target.
///
/// The response in `result` never carries `Set-Cookie`; the session cookie
/// is returned separately so callers can attach it to error responses.
pub async fn forward(state: &AppState, request: Request<Body>) -> Forwarded {
    let target = match target_url(request.uri(), &state.mount_prefix) {
        Ok(target) => target,
        Err(e) => {
            return Forwarded {
                set_cookie: None,
                result: Err(e),
            }
        }
    };
    let session = match state.sessions.resolve(request.headers()) {
        Ok(session) => session,
        Err(e) => {
            return Forwarded {
                set_cookie: None,
                result: Err(e.into()),
            }
        }
    };

    let result = dispatch(state, request, target, &session.id, session.is_new()).await;
    Forwarded {
        set_cookie: session.set_cookie,
        result,
    }
}

async fn dispatch(
    state: &AppState,
    request: Request<Body>,
    target: Url,
    session: &SessionId,
    new_session: bool,
) -> Result<Response<Body>, ProxyError> {
    let (parts, body) = request.into_parts();
    let cookie_name = &state.sessions.config().cookie_name;

    let mut outbound = Request::builder()
        .method(parts.method.clone())
        .uri(target.as_str())
        .body(body)
        .map_err(|e| ProxyError::InvalidTarget(format!("{target}: {e}")))?;
    *outbound.headers_mut() = forwarded_request_headers(&parts.headers, cookie_name);

    let cookies = state.sessions.cookie_store(session)?;

    tracing::debug!(
        request_id = %request_id(&parts.headers),
        method = %parts.method,
        target = %target,
        new_session,
        "Proxying request"
    );

    let upstream = state.executor.execute(outbound, cookies).await?;

    let (mut response_parts, response_body) = upstream.into_parts();
    filter_response_headers(&mut response_parts.headers);

    // Status and headers are committed once this body starts streaming;
    // a failure from here on can only be logged.
    let target_for_log = target.to_string();
    let body = response_body.into_data_stream().inspect_err(move |e| {
        metrics::record_body_stream_error();
        tracing::warn!(target = %target_for_log, error = %e, "Response body stream failed");
    });

    Ok(Response::from_parts(response_parts, Body::from_stream(body)))
}
