//! Outbound request execution.
//!
//! # Data Flow
//! ```text
//! Forwarding handler (outbound request + session cookie store)
//!     → executor.rs (Executor trait, swappable in tests)
//!     → transport.rs (pooled reqwest client, cookies per hop)
//!     → redirect.rs (follow or return 3xx)
//!     → Response streamed back to the handler
//! ```
//!
//! # Design Decisions
//! - One connection pool for the whole process; cookie stores are per call
//! - Redirect policy and timeouts are executor configuration, invisible to
//!   the forwarding handler
//! - No retries: a transport failure is reported once

pub mod executor;
pub mod redirect;
pub mod transport;

pub use executor::{ExecuteError, Executor};
pub use redirect::RedirectPolicy;
pub use transport::HttpExecutor;
