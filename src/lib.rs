//! Session-aware forwarding proxy library.
//!
//! Requests to `/proxy/<absolute-url>` are forwarded to `<absolute-url>`.
//! Each client session gets a private cookie store, so cookies set by
//! targets are replayed within that session and never leak to the client
//! or to other sessions.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod session;

pub use client::{Executor, HttpExecutor};
pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use session::{SessionId, SessionManager};
