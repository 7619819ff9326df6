//! # Observability
//!
//! - `logging`: `tracing` subscriber setup
//! - `metrics`: Prometheus metrics collection

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::{gather_metrics, register_metrics};
