//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the session proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Mount point of the forwarding handler.
    pub proxy: ForwardConfig,

    /// Outbound client settings (timeouts, redirect policy).
    pub upstream: UpstreamConfig,

    /// Session cookie and session table settings.
    pub session: SessionConfig,

    /// Inbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Forwarding handler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Path marker that precedes the embedded target URL.
    pub mount_prefix: String,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            mount_prefix: "/proxy/".to_string(),
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Per-hop timeout (send + read body) in seconds.
    pub request_timeout_secs: u64,

    /// Follow 3xx responses instead of returning them to the client.
    pub follow_redirects: bool,

    /// Maximum number of redirects followed for a single request.
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            follow_redirects: true,
            max_redirects: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session cookie and session table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session identifier.
    pub cookie_name: String,

    /// Path attribute of the session cookie.
    pub cookie_path: String,

    /// Max-Age attribute of the session cookie in seconds.
    pub max_age_secs: u64,

    /// Mark the session cookie `Secure`.
    pub secure: bool,

    /// Sessions unused for this long are evicted.
    pub idle_ttl_secs: u64,

    /// Interval of the background eviction sweep in seconds.
    pub sweep_interval_secs: u64,

    /// Upper bound on live sessions (0 = unbounded).
    /// When full, the least recently used session is evicted.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "proxy-session-id".to_string(),
            cookie_path: "/".to_string(),
            max_age_secs: 3600,
            secure: true,
            idle_ttl_secs: 3600,
            sweep_interval_secs: 60,
            max_sessions: 0,
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_cookie_contract() {
        let config = ProxyConfig::default();
        assert_eq!(config.proxy.mount_prefix, "/proxy/");
        assert_eq!(config.session.cookie_name, "proxy-session-id");
        assert_eq!(config.session.max_age_secs, 3600);
        assert!(config.session.secure);
        assert_eq!(config.session.idle_ttl(), Duration::from_secs(3600));
        assert!(config.upstream.follow_redirects);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            follow_redirects = false

            [session]
            max_sessions = 500
            "#,
        )
        .unwrap();

        assert!(!config.upstream.follow_redirects);
        assert_eq!(config.upstream.max_redirects, 10);
        assert_eq!(config.session.max_sessions, 500);
        assert_eq!(config.session.cookie_name, "proxy-session-id");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
