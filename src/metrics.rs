/// Prometheus metrics for the wallet service
///
/// - HTTP request counts and latencies
/// - Signup and verification outcomes
/// - Ledger entries by type and the reserve balance
/// - Name resolutions by source

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========== Account Metrics ==========

    pub static ref SIGNUPS_TOTAL: IntCounter = register_int_counter!(
        "wallet_signups_total",
        "Signup requests that issued a one-time code"
    )
    .unwrap();

    /// Verifications by outcome (created, mismatch, expired)
    pub static ref VERIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wallet_verifications_total",
        "One-time code verifications by outcome",
        &["outcome"]
    )
    .unwrap();

    // ========== Ledger Metrics ==========

    pub static ref LEDGER_ENTRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wallet_ledger_entries_total",
        "Ledger entries appended, by transaction type",
        &["type"]
    )
    .unwrap();

    pub static ref COUPON_REDEMPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wallet_coupon_redemptions_total",
        "Coupon redemptions by code",
        &["code"]
    )
    .unwrap();

    /// Last observed reserve balance
    pub static ref RESERVE_BALANCE: IntGauge = register_int_gauge!(
        "wallet_reserve_balance",
        "Simulated administrative reserve"
    )
    .unwrap();

    // ========== Collaborator Metrics ==========

    /// Name resolutions by source (resolver, fallback, unresolved)
    pub static ref NAME_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wallet_name_resolutions_total",
        "Account-name resolutions by source",
        &["source"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_signup() {
    SIGNUPS_TOTAL.inc();
}

pub fn record_verification(outcome: &str) {
    VERIFICATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_ledger_entry(transaction_type: &str) {
    LEDGER_ENTRIES_TOTAL
        .with_label_values(&[transaction_type])
        .inc();
}

pub fn record_coupon_redemption(code: &str) {
    COUPON_REDEMPTIONS_TOTAL.with_label_values(&[code]).inc();
}

pub fn set_reserve_balance(balance: i64) {
    RESERVE_BALANCE.set(balance);
}

pub fn record_name_resolution(source: &str) {
    NAME_RESOLUTIONS_TOTAL.with_label_values(&[source]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/dashboard", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_ledger_metrics_rendered() {
        record_ledger_entry("CONVERSION");
        record_coupon_redemption("WELCOME500");
        set_reserve_balance(1_500_000);

        let metrics = render_metrics();
        assert!(metrics.contains("wallet_ledger_entries_total"));
        assert!(metrics.contains("wallet_coupon_redemptions_total"));
        assert!(metrics.contains("wallet_reserve_balance"));
    }

    #[test]
    fn test_account_metrics_rendered() {
        record_signup();
        record_verification("created");
        record_name_resolution("fallback");

        let metrics = render_metrics();
        assert!(metrics.contains("wallet_signups_total"));
        assert!(metrics.contains("wallet_verifications_total"));
        assert!(metrics.contains("wallet_name_resolutions_total"));
    }
}
