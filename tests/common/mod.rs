//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{Path, RawQuery, State};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::Router;
use tokio::net::TcpListener;

use session_proxy::client::{ExecuteError, Executor};
use session_proxy::session::{SessionManager, SharedCookieStore};
use session_proxy::{HttpServer, ProxyConfig, SessionId, Shutdown};

pub const SESSION_COOKIE: &str = "proxy-session-id";

/// Start a mock target on an ephemeral port.
///
/// Routes:
/// - `/set/{name}/{value}`: sets a cookie, body `ok`
/// - `/echo`: body is the received `Cookie` header (empty if none)
/// - `/header/{name}`: body is the received header value
/// - `/query`: body is the raw query string
/// - `/upload`: POST, body echoed
/// - `/status/{code}`: given status, sets cookie `leak=1` and `x-target: yes`
/// - `/redirect/{n}`: 301 to `/redirect/{n-1}`, `/redirect/0` answers 200
/// - `/slow/{ms}`: answers `slow` after a delay
/// - `/truncated`: 200 with `x-target: yes`, then the body aborts mid-stream
/// - `/hop-auth`: 302 to `/header/authorization` on the same origin
/// - `/hop-auth/{port}`: 302 to `/header/authorization` on `127.0.0.1:{port}`
pub async fn start_target() -> SocketAddr {
    let app = Router::new()
        .route("/set/{name}/{value}", get(set_cookie))
        .route("/echo", any(echo_cookies))
        .route("/header/{name}", get(echo_header))
        .route("/query", get(echo_query))
        .route("/upload", post(echo_body))
        .route("/status/{code}", any(status_with_cookie))
        .route("/redirect/{n}", get(redirect_chain))
        .route("/slow/{ms}", get(slow))
        .route("/truncated", get(truncated))
        .route("/hop-auth", get(hop_auth_same_origin))
        .route("/hop-auth/{port}", get(hop_auth_other_port));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn set_cookie(Path((name, value)): Path<(String, String)>) -> impl IntoResponse {
    (
        [(SET_COOKIE, format!("{name}={value}; Path=/"))],
        "ok",
    )
}

async fn echo_cookies(headers: HeaderMap) -> String {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn echo_header(Path(name): Path<String>, headers: HeaderMap) -> String {
    headers
        .get(name.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn echo_query(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

async fn echo_body(body: String) -> String {
    body
}

async fn status_with_cookie(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap();
    (
        status,
        [("set-cookie", "leak=1; Path=/"), ("x-target", "yes")],
        format!("status {code}"),
    )
}

async fn redirect_chain(Path(n): Path<u32>) -> Response<Body> {
    if n == 0 {
        return (StatusCode::OK, "final destination").into_response();
    }
    (
        StatusCode::MOVED_PERMANENTLY,
        [
            (LOCATION, format!("/redirect/{}", n - 1)),
            (SET_COOKIE, format!("hop{n}=1; Path=/")),
        ],
        "Moved Permanently",
    )
        .into_response()
}

async fn slow(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "slow"
}

async fn truncated() -> impl IntoResponse {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"first half")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "target gave up")),
    ];
    (
        [("x-target", "yes")],
        Body::from_stream(futures_util::stream::iter(chunks)),
    )
}

async fn hop_auth_same_origin() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, "/header/authorization")])
}

async fn hop_auth_other_port(Path(port): Path<u16>) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(LOCATION, format!("http://127.0.0.1:{port}/header/authorization"))],
    )
}

/// A target whose only route never answers.
pub struct HangingTarget {
    pub addr: SocketAddr,
    pub started: Arc<AtomicBool>,
    /// Set once the target's handler future has been dropped.
    pub dropped: Arc<AtomicBool>,
}

#[derive(Clone)]
struct HangFlags {
    started: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn hang(State(flags): State<HangFlags>) -> &'static str {
    let _guard = SetOnDrop(flags.dropped.clone());
    flags.started.store(true, Ordering::SeqCst);
    std::future::pending::<()>().await;
    "unreachable"
}

pub async fn start_hanging_target() -> HangingTarget {
    let flags = HangFlags {
        started: Arc::new(AtomicBool::new(false)),
        dropped: Arc::new(AtomicBool::new(false)),
    };
    let app = Router::new()
        .route("/hang", get(hang))
        .with_state(flags.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    HangingTarget {
        addr,
        started: flags.started,
        dropped: flags.dropped,
    }
}

/// Poll `flag` until it is set or `limit` elapses.
pub async fn wait_for(flag: &AtomicBool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    flag.load(Ordering::SeqCst)
}

/// A running proxy bound to an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub sessions: Arc<SessionManager>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    /// URL that asks the proxy to forward to `http://{target}{path}`.
    pub fn url(&self, target: SocketAddr, path: &str) -> String {
        format!("http://{}/proxy/http://{}{}", self.addr, target, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy using the real HTTP executor.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let server = HttpServer::new(config).unwrap();
    let sessions = server.sessions();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        sessions,
        shutdown,
    }
}

/// A client that neither follows redirects nor keeps cookies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// The session identifier issued by the proxy, if any.
pub fn issued_session(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Cookie` header value presenting `id` to the proxy.
pub fn session_header(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}")
}

/// A fresh identifier the proxy will accept.
pub fn new_session() -> String {
    SessionId::generate().to_string()
}

/// Executor that records calls and answers with a canned response.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: AtomicUsize,
    last_headers: Mutex<Option<HeaderMap>>,
    last_uri: Mutex<Option<String>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.last_headers.lock().unwrap().clone()
    }

    pub fn last_uri(&self) -> Option<String> {
        self.last_uri.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(
        &self,
        request: Request<Body>,
        _cookies: SharedCookieStore,
    ) -> Result<Response<Body>, ExecuteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_headers.lock().unwrap() = Some(request.headers().clone());
        *self.last_uri.lock().unwrap() = Some(request.uri().to_string());

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(SET_COOKIE, "target=secret; Path=/")
            .header("x-target", "recorded")
            .body(Body::from("recorded"))
            .unwrap())
    }
}
