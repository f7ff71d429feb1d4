//! Header filtering between client, proxy and target.
//!
//! # Responsibilities
//! - Copy client headers onto the outbound request
//! - Strip hop-by-hop headers in both directions
//! - Keep the proxy's own session cookie away from targets
//! - Keep target `Set-Cookie` headers away from clients
//!
//! # Design Decisions
//! - `Host` is derived from the target URL by the transport
//! - Target cookies live only in the session's cookie store

use axum::http::header::{
    CONNECTION, COOKIE, HOST, SET_COOKIE, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

fn is_hop_by_hop(name: &HeaderName) -> bool {
    [CONNECTION, KEEP_ALIVE, PROXY_CONNECTION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE]
        .contains(name)
}

/// Headers for the outbound request built from the client's headers.
pub fn forwarded_request_headers(inbound: &HeaderMap, session_cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if *name == HOST || is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    strip_cookie(&mut headers, session_cookie);
    headers
}

/// Remove `Set-Cookie` and hop-by-hop headers from a target response.
pub fn filter_response_headers(headers: &mut HeaderMap) {
    headers.remove(SET_COOKIE);
    for name in [CONNECTION, KEEP_ALIVE, PROXY_CONNECTION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE] {
        headers.remove(name);
    }
}

/// Drop every `name=value` pair called `name` from the `Cookie` headers,
/// leaving the other client cookies untouched.
pub fn strip_cookie(headers: &mut HeaderMap, name: &str) {
    if !headers.contains_key(COOKIE) {
        return;
    }

    let kept: Vec<HeaderValue> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| {
            let Ok(text) = value.to_str() else {
                return Some(value.clone());
            };
            let pairs: Vec<&str> = text
                .split(';')
                .map(str::trim)
                .filter(|pair| !pair.is_empty())
                .filter(|pair| pair.split_once('=').map_or(*pair, |(n, _)| n.trim()) != name)
                .collect();
            if pairs.is_empty() {
                None
            } else {
                HeaderValue::from_str(&pairs.join("; ")).ok()
            }
        })
        .collect();

    headers.remove(COOKIE);
    for value in kept {
        headers.append(COOKIE, value);
    }
}
