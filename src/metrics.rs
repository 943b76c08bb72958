/// Metrics Module - Prometheus Instrumentation
///
/// - store operation latency by op
/// - reconciler path taken per page
/// - soft-inconsistency and enrichment-failure counters

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Standard latency buckets for histograms (seconds)
const LATENCY_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Labels: op (card, score, scores, rev_range, range_by_score, store_top,
    /// store_diff, store_union, delete, get_many)
    pub static ref STORE_OP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("tokenblox_store_op_duration_seconds", "Ordered-set store operation latency")
            .buckets(LATENCY_BUCKETS.to_vec()),
        &["op"]
    ).unwrap();

    /// Labels: op
    pub static ref STORE_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("tokenblox_store_errors_total", "Store operations that failed or timed out"),
        &["op"]
    ).unwrap();

    /// Labels: path (pending_only, merged, short_circuit)
    pub static ref VIEW_PAGES: IntCounterVec = IntCounterVec::new(
        Opts::new("tokenblox_view_pages_total", "Pages served by the view reconciler"),
        &["path"]
    ).unwrap();

    /// Listed members whose record was missing or undecodable
    pub static ref RECORDS_DROPPED: IntCounter = IntCounter::new(
        "tokenblox_records_dropped_total",
        "Listed members dropped because no record could be resolved"
    ).unwrap();

    pub static ref ENRICHMENT_FAILURES: IntCounter = IntCounter::new(
        "tokenblox_enrichment_failures_total",
        "Best-effort listing enrichments that failed and were defaulted"
    ).unwrap();
}

/// Registers all collectors. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(STORE_OP_DURATION.clone()));
    let _ = REGISTRY.register(Box::new(STORE_ERRORS.clone()));
    let _ = REGISTRY.register(Box::new(VIEW_PAGES.clone()));
    let _ = REGISTRY.register(Box::new(RECORDS_DROPPED.clone()));
    let _ = REGISTRY.register(Box::new(ENRICHMENT_FAILURES.clone()));
}

/// Text exposition format for `GET /metrics`.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Observes elapsed time into `STORE_OP_DURATION` when dropped.
pub struct OpTimer {
    op: &'static str,
    start: Instant,
}

impl OpTimer {
    pub fn new(op: &'static str) -> Self {
        Self { op, start: Instant::now() }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        STORE_OP_DURATION
            .with_label_values(&[self.op])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

pub fn record_store_error(op: &str) {
    STORE_ERRORS.with_label_values(&[op]).inc();
}

pub fn record_view_page(path: &str) {
    VIEW_PAGES.with_label_values(&[path]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_contains_registered_metrics() {
        init_metrics();
        record_view_page("merged");
        {
            let _t = OpTimer::new("card");
        }
        let text = gather_metrics();
        assert!(text.contains("tokenblox_view_pages_total"));
        assert!(text.contains("tokenblox_store_op_duration_seconds"));
    }
}
