//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): handler latency
//! - `proxy_sessions_created_total` (counter): cookie stores created
//! - `proxy_sessions_evicted_total` (counter): evictions by reason
//! - `proxy_sessions_active` (gauge): live sessions
//! - `proxy_body_stream_errors_total` (counter): truncated responses
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start_time: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_session_created() {
    counter!("proxy_sessions_created_total").increment(1);
}

pub fn record_sessions_evicted(reason: &'static str, count: usize) {
    counter!("proxy_sessions_evicted_total", "reason" => reason).increment(count as u64);
}

pub fn record_active_sessions(count: usize) {
    gauge!("proxy_sessions_active").set(count as f64);
}

pub fn record_body_stream_error() {
    counter!("proxy_body_stream_errors_total").increment(1);
}
