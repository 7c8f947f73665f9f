//! Workload generation: arrival policies and the seeded task generator.

pub mod generator;

pub use generator::{Arrival, ArrivalPolicy, TaskGenerator, TraceArrival};
