use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use lazy_static::lazy_static;
use std::sync::Once;
use log::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref PROXY_REQUESTS: IntCounter = IntCounter::new(
        "lifi_proxy_requests_total",
        "Total number of requests forwarded to Li.Fi"
    ).unwrap();

    pub static ref PROXY_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("lifi_proxy_errors_total", "Proxy errors by returned HTTP status"),
        &["status"]
    ).unwrap();

    pub static ref UPSTREAM_LATENCY: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "lifi_upstream_latency_seconds",
            "Li.Fi call latency in seconds"
        ).buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 15.0])
    ).unwrap();

    pub static ref REGISTRY_CALL_FAILURES: IntCounter = IntCounter::new(
        "registry_call_failures_total",
        "Failed calls against the transaction registry contract"
    ).unwrap();
}

static INIT: Once = Once::new();

/// Registers every collector once; later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let result = REGISTRY.register(Box::new(PROXY_REQUESTS.clone()))
            .and_then(|_| REGISTRY.register(Box::new(PROXY_ERRORS.clone())))
            .and_then(|_| REGISTRY.register(Box::new(UPSTREAM_LATENCY.clone())))
            .and_then(|_| REGISTRY.register(Box::new(REGISTRY_CALL_FAILURES.clone())));
        if let Err(e) = result {
            error!("Failed to register metrics: {}", e);
        }
    });
}

pub fn record_proxy_error(status: u16) {
    let label = status.to_string();
    PROXY_ERRORS.with_label_values(&[label.as_str()]).inc();
}

/// Prometheus text exposition of the registry.
pub fn gather() -> crate::error::Result<String> {
    init();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| crate::error::Error::InternalError(e.to_string()))
}
