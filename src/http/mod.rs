//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handler.rs (forward to the embedded target)
//!         → target.rs (extract target URL)
//!         → headers.rs (filter headers both ways)
//!     → Send to client
//! ```

pub mod handler;
pub mod headers;
pub mod request;
pub mod server;
pub mod target;

pub use handler::{forward, proxy_handler, Forwarded};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
