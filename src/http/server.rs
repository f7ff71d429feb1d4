//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (tracing, request timeout, request ID)
//! - Own the session table and the executor shared by all requests
//! - Serve until shutdown, running the session sweeper alongside

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::client::{ExecuteError, Executor, HttpExecutor};
use crate::config::ProxyConfig;
use crate::http::handler::proxy_handler;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::session::SessionManager;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub executor: Arc<dyn Executor>,
    pub mount_prefix: Arc<str>,
}

/// HTTP server for the session proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    sessions: Arc<SessionManager>,
}

impl HttpServer {
    /// Create a server that forwards through the default HTTP executor.
    pub fn new(config: ProxyConfig) -> Result<Self, ExecuteError> {
        let executor = Arc::new(HttpExecutor::new(&config.upstream)?);
        Ok(Self::with_executor(config, executor))
    }

    /// Create a server with a caller-supplied executor.
    pub fn with_executor(config: ProxyConfig, executor: Arc<dyn Executor>) -> Self {
        let sessions = Arc::new(SessionManager::new(config.session.clone()));
        Self::with_parts(config, sessions, executor)
    }

    /// Create a server around an existing session table and executor.
    pub fn with_parts(
        config: ProxyConfig,
        sessions: Arc<SessionManager>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let state = AppState {
            sessions: sessions.clone(),
            executor,
            mount_prefix: Arc::from(config.proxy.mount_prefix.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Every path reaches the handler; requests without the mount marker
    /// are rejected there. A request that outlives `timeouts.request_secs`
    /// is answered with 504.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_prefix = %self.config.proxy.mount_prefix,
            "HTTP server starting"
        );

        let sweeper = self.sessions.clone().spawn_sweeper(shutdown.resubscribe());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        let _ = sweeper.await;
        tracing::info!(
            active_sessions = self.sessions.len(),
            "HTTP server stopped"
        );
        Ok(())
    }
}
