//! Telemetry and reporting subsystem.
//!
//! Live counters for observing a run in progress, the final metrics report
//! computed from a finished run's history, and export of that report.

pub mod metrics;
pub mod report;

#[cfg(feature = "telemetry")]
pub mod export;

pub use metrics::{Metrics, MetricsSnapshot};
pub use report::{
    LoadImbalance, MetricsCollector, MetricsReport, ProcessorReport, TurnaroundPercentiles,
};

#[cfg(feature = "telemetry")]
pub use export::{ConsoleExporter, JsonExporter, MetricsExporter};
