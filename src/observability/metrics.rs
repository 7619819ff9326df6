//! # Metrics
//!
//! Prometheus metrics for monitoring the provider.
//!
//! ## Metrics Exposed
//!
//! - `tsi_provider_operations_total` - Lifecycle operations by operation and outcome
//! - `tsi_provider_operation_duration_seconds` - Duration of lifecycle operations
//! - `tsi_provider_api_errors_total` - Failed management API requests by request kind
//! - `tsi_provider_lro_polls_total` - Long-running operation status polls

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tsi_provider_operations_total",
            "Total number of environment lifecycle operations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "tsi_provider_operation_duration_seconds",
            "Duration of environment lifecycle operations in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 900.0, 1800.0]),
        &["operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static API_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tsi_provider_api_errors_total",
            "Total number of failed management API requests by request kind",
        ),
        &["operation"],
    )
    .expect("Failed to create API_ERRORS_TOTAL metric - this should never happen")
});

static LRO_POLLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tsi_provider_lro_polls_total",
        "Total number of long-running operation status polls",
    )
    .expect("Failed to create LRO_POLLS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(API_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LRO_POLLS_TOTAL.clone()))?;

    Ok(())
}

/// Render every registered metric in the Prometheus text format
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a finished lifecycle operation
pub fn record_operation(operation: &str, outcome: &str, duration: f64) {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_api_errors(operation: &str) {
    API_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_lro_polls() {
    LRO_POLLS_TOTAL.inc();
}
