//! loadsim - multiprocessor load-balancing simulator
//!
//! A closed-world, tick-stepped simulation of a fixed set of processors, each
//! with its own ready queue, under two competing load-balancing strategies:
//! centralized least-loaded migration and distributed work stealing.
//!
//! # Quick Start
//!
//! ```no_run
//! use loadsim::prelude::*;
//!
//! let config = Config::builder()
//!     .processor_count(4)
//!     .strategy(BalancingStrategy::WorkStealing)
//!     .tick_budget(500)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let report = loadsim::simulate(config).unwrap();
//! println!("utilization: {:.2}", report.average_utilization);
//! ```
//!
//! # Features
//!
//! - **Deterministic**: every random draw comes from one seeded PCG stream
//! - **Two strategies**: periodic global rebalancing vs. idle-driven stealing
//! - **Fault injection**: take processors offline and bring them back
//! - **Reports**: utilization, waiting/turnaround time, load imbalance
//! - **Export**: JSON and console report exporters (`telemetry` feature)

#![warn(missing_debug_implementations)]

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scheduler;
pub mod telemetry;
pub mod workload;

// Re-export key types at crate root
pub use config::{AssignmentPolicy, BalancingStrategy, Config, ConfigBuilder, FaultEvent, FaultKind};
pub use engine::{Engine, EngineState, RunOutcome};
pub use error::{Error, Result};
pub use telemetry::{MetricsCollector, MetricsReport};

/// Build an engine from `config` and run it to completion.
pub fn simulate(config: Config) -> Result<MetricsReport> {
    Engine::new(config)?.run()
}
