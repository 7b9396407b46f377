//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_router_requests_total` (counter): dispatched requests by
//!   operation, namespace and status
//! - `image_router_request_duration_seconds` (histogram): handler latency
//! - `image_router_route_misses_total` (counter): requests no route matched,
//!   by method
//!
//! # Design Decisions
//! - Recording functions are always safe to call; without an installed
//!   recorder they do nothing
//! - Prometheus exporter runs its own listener on a separate address

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::Namespace;

pub const REQUESTS_TOTAL: &str = "image_router_requests_total";
pub const REQUEST_DURATION: &str = "image_router_request_duration_seconds";
pub const ROUTE_MISSES_TOTAL: &str = "image_router_route_misses_total";

/// Install the Prometheus recorder and start its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a request that reached a handler.
pub fn record_request(operation: &'static str, namespace: Namespace, status: u16, start: Instant) {
    let labels = [
        ("operation", operation.to_string()),
        ("namespace", namespace.as_str().to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!(REQUESTS_TOTAL, &labels[..]).increment(1);
    ::metrics::histogram!(REQUEST_DURATION, &labels[..2]).record(start.elapsed().as_secs_f64());
}

/// Record a request that matched no route.
pub fn record_route_miss(method: &str) {
    ::metrics::counter!(ROUTE_MISSES_TOTAL, "method" => method.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        record_request("list", Namespace::Compat, 200, Instant::now());
        record_route_miss("GET");
    }
}
