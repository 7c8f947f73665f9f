pub use crate::config::{AssignmentPolicy, BalancingStrategy, Config, ConfigBuilder, FaultEvent};
pub use crate::engine::{Engine, EngineState, RunOutcome};
pub use crate::error::{Error, Result};
pub use crate::executor::{Processor, Task, TaskId, Tick};
pub use crate::scheduler::{Balancer, BalancerKind, ProcessorId};
pub use crate::telemetry::{Metrics, MetricsCollector, MetricsReport, MetricsSnapshot};
pub use crate::workload::{ArrivalPolicy, TaskGenerator, TraceArrival};
pub use crate::simulate;

#[cfg(feature = "telemetry")]
pub use crate::telemetry::{ConsoleExporter, JsonExporter, MetricsExporter};
