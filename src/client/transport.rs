//! Default executor backed by a pooled `reqwest` client.
//!
//! # Responsibilities
//! - Share one connection pool across every session
//! - Layer the session's cookies onto each hop and record `Set-Cookie`
//! - Follow redirects according to [`RedirectPolicy`]
//! - Stream request and response bodies without buffering

use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response};
use url::Url;

use crate::client::redirect::{crosses_origin, RedirectAction, RedirectPolicy};
use crate::client::{ExecuteError, Executor};
use crate::config::UpstreamConfig;
use crate::session::SharedCookieStore;

/// Executes requests over HTTP(S) with a per-call cookie store.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    redirects: RedirectPolicy,
}

impl HttpExecutor {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ExecuteError> {
        Self::with_timeouts(
            config.connect_timeout(),
            config.request_timeout(),
            RedirectPolicy::from_config(config),
        )
    }

    pub fn with_timeouts(
        connect: Duration,
        request: Duration,
        redirects: RedirectPolicy,
    ) -> Result<Self, ExecuteError> {
        // Redirects are followed here, hop by hop, so each hop sees the
        // session's cookies.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(connect)
            .timeout(request)
            .no_proxy()
            .build()?;

        Ok(Self { client, redirects })
    }

    pub fn redirect_policy(&self) -> RedirectPolicy {
        self.redirects
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(
        &self,
        request: Request<Body>,
        cookies: SharedCookieStore,
    ) -> Result<Response<Body>, ExecuteError> {
        let (parts, body) = request.into_parts();
        let mut url = Url::parse(&parts.uri.to_string())
            .map_err(|e| ExecuteError::InvalidUrl(format!("{}: {e}", parts.uri)))?;
        let mut method = parts.method;
        let mut headers = parts.headers;

        let has_body = !body.is_end_stream();
        let mut body = has_body.then_some(body);
        let mut hops = 0;

        loop {
            let mut hop_headers = headers.clone();
            merge_cookies(&mut hop_headers, cookies.cookies(&url));

            let mut outbound = self
                .client
                .request(method.clone(), url.clone())
                .headers(hop_headers);
            if let Some(body) = body.take() {
                outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
            }

            let response = outbound.send().await?;
            cookies.set_cookies(&mut response.headers().get_all(SET_COOKIE).iter(), &url);

            tracing::trace!(
                url = %url,
                status = %response.status(),
                hop = hops,
                "Upstream hop completed"
            );

            let action = self.redirects.next_hop(
                response.status(),
                response.headers(),
                &method,
                &url,
                has_body,
            )?;

            let (next, next_method, keep_body) = match action {
                RedirectAction::Return => return Ok(into_response(response)),
                RedirectAction::Follow {
                    url,
                    method,
                    keep_body,
                } => (url, method, keep_body),
            };

            hops += 1;
            if hops > self.redirects.max_redirects {
                return Err(ExecuteError::TooManyRedirects(self.redirects.max_redirects));
            }

            if !keep_body {
                headers.remove(CONTENT_LENGTH);
                headers.remove(CONTENT_TYPE);
            }
            if crosses_origin(&url, &next) {
                headers.remove(AUTHORIZATION);
                headers.remove(COOKIE);
            }

            tracing::debug!(from = %url, to = %next, method = %next_method, "Following redirect");
            url = next;
            method = next_method;
        }
    }
}

/// Fold the session's cookies into the request's own `Cookie` header.
///
/// HTTP/1.1 allows a single `Cookie` header, so every value ends up in one.
fn merge_cookies(headers: &mut HeaderMap, session_cookies: Option<HeaderValue>) {
    let Some(session_cookies) = session_cookies else {
        return;
    };

    let mut pairs: Vec<&[u8]> = headers
        .get_all(COOKIE)
        .iter()
        .map(HeaderValue::as_bytes)
        .filter(|v| !v.is_empty())
        .collect();
    pairs.push(session_cookies.as_bytes());

    let merged = pairs.join(&b"; "[..]);
    if let Ok(value) = HeaderValue::from_bytes(&merged) {
        headers.insert(COOKIE, value);
    }
}

fn into_response(response: reqwest::Response) -> Response<Body> {
    let mut builder = Response::builder().status(response.status());
    if let Some(headers) = builder.headers_mut() {
        *headers = response.headers().clone();
    }
    // Status and headers come from a parsed response, so the builder
    // cannot fail.
    builder
        .body(Body::from_stream(response.bytes_stream()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
