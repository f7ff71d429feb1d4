//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → manager.rs resolve() (recognize cookie or issue id.rs identifier)
//!     → manager.rs cookie_store() (lookup, or create once via store.rs factory)
//!     → SharedCookieStore handed to the executor for this request
//!
//! Background:
//!     sweeper task → evict_idle() every sweep interval
//! ```
//!
//! # Design Decisions
//! - One cookie store per session, never shared across sessions
//! - Store creation failure aborts the request; there is no shared fallback
//! - Sessions live in memory only and expire after an idle period

pub mod id;
pub mod manager;
pub mod store;

pub use id::SessionId;
pub use manager::{ResolvedSession, SessionManager};
pub use store::{CookieStoreFactory, JarFactory, SharedCookieStore};

use axum::http::header::InvalidHeaderValue;

/// Errors raised while resolving a session or its cookie store.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session cookie store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid session cookie: {0}")]
    Cookie(#[from] InvalidHeaderValue),
}
