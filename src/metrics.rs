// Prometheus metrics definitions for the catalog backend.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Catalog lookups, by result (hit, miss).
    pub static ref CATALOG_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pokedex_catalog_lookups_total", "Catalog lookups by result"),
        &["result"],
    )
    .unwrap();

    /// Synchronizations attempted after a miss, by outcome.
    pub static ref SYNC_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pokedex_sync_total", "Synchronizations by outcome"),
        &["outcome"],
    )
    .unwrap();

    /// Requests sent to the external provider, by endpoint (pokemon, move) and outcome.
    pub static ref PROVIDER_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pokedex_provider_requests_total", "Provider requests"),
        &["endpoint", "outcome"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pokedex_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Time spent synchronizing one creature (fetch through re-read).
    pub static ref SYNC_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("pokedex_sync_duration_seconds", "Synchronization duration in seconds")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap();

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "pokedex_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(CATALOG_LOOKUPS_TOTAL.clone()),
            Box::new(SYNC_TOTAL.clone()),
            Box::new(PROVIDER_REQUESTS_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(SYNC_DURATION_SECONDS.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            REGISTRY.register(c).expect("failed to register metric");
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Map a request path to its route template for metric labels. Paths that
/// match no route share the `other` label.
pub fn normalize_path(path: &str) -> &'static str {
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    match segments.as_slice() {
        ["health"] => "/health",
        ["metrics"] => "/metrics",
        ["api", "pokemon"] => "/api/pokemon",
        ["api", "pokemon", id] if !id.is_empty() => "/api/pokemon/:identifier",
        ["api", "pokemon", id, "moves"] if !id.is_empty() => "/api/pokemon/:identifier/moves",
        _ => "other",
    }
}
