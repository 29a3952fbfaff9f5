//! Prometheus metrics for the karma economy.
//!
//! Metrics are recorded through the `metrics` facade and exported in
//! Prometheus text format when an exporter is installed. Without one, every
//! call here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Trade Metrics**: Trade requests and escrow transitions
//! - **Wallet Metrics**: Gifts and their amounts
//! - **Valuation Metrics**: Listed item prices
//! - **Store Metrics**: Ping latency and failures
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use karma_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/wallet/gift", 200);
//! metrics::gift_recorded(25);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Trade Metrics
// ============================================================================

/// Count a trade request by outcome (`created`, `replayed`, `rejected`).
pub fn trade_requests_total(outcome: &str) {
    metrics::counter!("karma_trade_requests_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Count an escrow moving into `status`.
pub fn escrow_transitions_total(status: &str) {
    metrics::counter!("karma_escrow_transitions_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record karma moved through escrow.
pub fn escrow_amount(amount: i64) {
    metrics::histogram!("karma_escrow_amount").record(amount as f64);
}

// ============================================================================
// Wallet Metrics
// ============================================================================

/// Count a successful gift and record its size.
pub fn gift_recorded(amount: i64) {
    metrics::counter!("karma_gifts_total").increment(1);
    metrics::histogram!("karma_gift_amount").record(amount as f64);
}

/// Count a rejected balance operation (`insufficient`, `invalid`, ...).
pub fn ledger_rejections_total(reason: &str) {
    metrics::counter!("karma_ledger_rejections_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

// ============================================================================
// Valuation Metrics
// ============================================================================

/// Record the price of a newly listed item.
pub fn listing_value(category: &str, total: i64) {
    metrics::counter!("karma_items_listed_total",
        "category" => category.to_string()
    )
    .increment(1);
    metrics::histogram!("karma_listing_value",
        "category" => category.to_string()
    )
    .record(total as f64);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record store ping latency in milliseconds.
pub fn store_ping_duration_ms(duration_ms: f64) {
    metrics::histogram!("karma_store_ping_duration_ms").record(duration_ms);
}

/// Count a store failure surfaced to a client.
pub fn store_errors_total(operation: &str) {
    metrics::counter!("karma_store_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        trade_requests_total("created");
        escrow_transitions_total("released");
        escrow_amount(750);
        gift_recorded(25);
        ledger_rejections_total("insufficient");
        listing_value("electronics", 750);
        store_ping_duration_ms(0.4);
        store_errors_total("gift");
    }
}
