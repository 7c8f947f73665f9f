//! Load-balancing subsystem.
//!
//! A balancer observes processor loads and migrates queued tasks between
//! processors. Two strategies are provided: a centralized least-loaded
//! balancer with a periodic global view, and peer-to-peer work stealing where
//! only idle processors act. The engine talks to both through [`Balancer`].

pub mod centralized;
pub mod coordinator;
pub mod trace;
pub mod work_stealing;

pub use centralized::CentralizedBalancer;
pub use coordinator::BalancerKind;
pub use trace::{ExecutionTrace, TraceEvent};
pub use work_stealing::WorkStealingBalancer;

use crate::executor::{Processor, TaskId, Tick};
use serde::{Deserialize, Serialize};

/// Unique identifier for a simulated processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessorId(pub usize);

impl std::fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Who initiated a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    /// Pushed by the central balancer.
    Rebalance,
    /// Pulled by an idle processor.
    Steal,
}

/// A single task moved from one queue to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub task: TaskId,
    pub from: ProcessorId,
    pub to: ProcessorId,
    pub tick: Tick,
    pub kind: MigrationKind,
}

/// A load-balancing strategy.
pub trait Balancer {
    /// Run one balancing pass over `processors` at tick `now`.
    ///
    /// Implementations only move queued tasks; they never touch executing
    /// tasks or busy/idle counters. A pass with nothing to do returns an
    /// empty list.
    fn rebalance(&mut self, processors: &mut [Processor], now: Tick) -> Vec<Migration>;

    /// Short strategy name for logs and reports.
    fn name(&self) -> &'static str;
}

/// Fresh per-pass view of every processor's load.
pub(crate) fn loads(processors: &[Processor]) -> Vec<usize> {
    processors.iter().map(Processor::load).collect()
}

/// Move one task from `processors[from]` to `processors[to]`.
///
/// Both queues are borrowed together for the duration of the move, so the
/// task is never visible in two places.
pub(crate) fn migrate(
    processors: &mut [Processor],
    from: usize,
    to: usize,
    now: Tick,
    kind: MigrationKind,
) -> Option<Migration> {
    if from == to {
        return None;
    }

    let (src, dst) = if from < to {
        let (left, right) = processors.split_at_mut(to);
        (&mut left[from], &mut right[0])
    } else {
        let (left, right) = processors.split_at_mut(from);
        (&mut right[0], &mut left[to])
    };

    let task = src.migrate_to(dst)?;
    Some(Migration {
        task,
        from: src.id(),
        to: dst.id(),
        tick: now,
        kind,
    })
}
