//! Prometheus metrics for rental-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rental_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Stats cache lookups by outcome.
pub static STATS_CACHE_LOOKUPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rental_stats_cache_lookups_total",
        "Stats cache lookups by result",
        &["shape", "result"] // hit, miss, error
    )
    .expect("Failed to register stats_cache_lookups")
});

/// Notifications transitioned to read.
pub static NOTIFICATIONS_MARKED_READ: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rental_notifications_marked_read_total",
        "Notifications marked as read",
        &["mode"] // all, selected
    )
    .expect("Failed to register notifications_marked_read")
});

/// Payment webhook events by resulting status.
pub static PAYMENT_WEBHOOKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rental_payment_webhooks_total",
        "Payment webhook events applied",
        &["status"]
    )
    .expect("Failed to register payment_webhooks_total")
});

/// Invoice backfill outcomes.
pub static BACKFILL_INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rental_backfill_invoices_total",
        "Invoices visited by the item backfill",
        &["outcome"] // fixed, skipped, failed
    )
    .expect("Failed to register backfill_invoices_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&STATS_CACHE_LOOKUPS);
    Lazy::force(&NOTIFICATIONS_MARKED_READ);
    Lazy::force(&PAYMENT_WEBHOOKS_TOTAL);
    Lazy::force(&BACKFILL_INVOICES_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
