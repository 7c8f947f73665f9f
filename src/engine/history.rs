//! Everything the engine records while it runs.
//!
//! A [`RunHistory`] is the only input the metrics collector needs, so a
//! finished run can be re-analyzed without touching the engine.

use crate::config::BalancingStrategy;
use crate::executor::{Processor, Task, Tick};
use crate::scheduler::{Migration, MigrationKind, ProcessorId};
use serde::{Deserialize, Serialize};

/// Per-processor state sampled at the end of a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: Tick,
    /// Queued tasks only.
    pub queue_lengths: Vec<usize>,
    pub executing: Vec<bool>,
    pub online: Vec<bool>,
}

impl TickSnapshot {
    pub fn capture(tick: Tick, processors: &[Processor]) -> Self {
        Self {
            tick,
            queue_lengths: processors.iter().map(Processor::queue_len).collect(),
            executing: processors.iter().map(Processor::is_executing).collect(),
            online: processors.iter().map(Processor::is_online).collect(),
        }
    }

    /// Max minus min queue length across processors.
    pub fn spread(&self) -> usize {
        let max = self.queue_lengths.iter().copied().max().unwrap_or(0);
        let min = self.queue_lengths.iter().copied().min().unwrap_or(0);
        max - min
    }
}

/// Final counters of one processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorStats {
    pub id: ProcessorId,
    pub busy_ticks: u64,
    pub idle_ticks: u64,
    pub tasks_completed: u64,
    pub migrated_in: u64,
    pub migrated_out: u64,
}

impl From<&Processor> for ProcessorStats {
    fn from(p: &Processor) -> Self {
        Self {
            id: p.id(),
            busy_ticks: p.busy_ticks(),
            idle_ticks: p.idle_ticks(),
            tasks_completed: p.tasks_completed(),
            migrated_in: p.migrated_in(),
            migrated_out: p.migrated_out(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// The tick budget ran out with tasks still queued or executing.
    NonTerminating { remaining: usize },
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistory {
    pub strategy: BalancingStrategy,
    pub processor_count: usize,
    pub snapshots: Vec<TickSnapshot>,
    /// In completion order.
    pub completed: Vec<Task>,
    pub tasks_generated: u64,
    pub rebalance_migrations: u64,
    pub steals: u64,
    pub ticks_elapsed: Tick,
    /// Filled in when the run finishes.
    pub processors: Vec<ProcessorStats>,
    pub outcome: Option<RunOutcome>,
}

impl RunHistory {
    pub fn new(strategy: BalancingStrategy, processor_count: usize) -> Self {
        Self {
            strategy,
            processor_count,
            snapshots: Vec::new(),
            completed: Vec::new(),
            tasks_generated: 0,
            rebalance_migrations: 0,
            steals: 0,
            ticks_elapsed: 0,
            processors: Vec::new(),
            outcome: None,
        }
    }

    pub(crate) fn record_migrations(&mut self, migrations: &[Migration]) {
        for m in migrations {
            match m.kind {
                MigrationKind::Rebalance => self.rebalance_migrations += 1,
                MigrationKind::Steal => self.steals += 1,
            }
        }
    }

    pub fn migrations(&self) -> u64 {
        self.rebalance_migrations + self.steals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TaskId;

    #[test]
    fn test_snapshot_spread() {
        let mut procs: Vec<Processor> = (0..3).map(|i| Processor::new(ProcessorId(i))).collect();
        for i in 0..4 {
            procs[1].enqueue(Task::new(TaskId(i), 0, 1));
        }
        procs[2].enqueue(Task::new(TaskId(9), 0, 1));

        let snap = TickSnapshot::capture(3, &procs);
        assert_eq!(snap.queue_lengths, vec![0, 4, 1]);
        assert_eq!(snap.spread(), 4);
        assert_eq!(snap.executing, vec![false; 3]);
    }

    #[test]
    fn test_migration_counts() {
        let mut history = RunHistory::new(BalancingStrategy::Centralized, 2);
        let m = Migration {
            task: TaskId(0),
            from: ProcessorId(0),
            to: ProcessorId(1),
            tick: 0,
            kind: MigrationKind::Rebalance,
        };
        history.record_migrations(&[m, Migration { kind: MigrationKind::Steal, ..m }]);
        assert_eq!(history.rebalance_migrations, 1);
        assert_eq!(history.steals, 1);
        assert_eq!(history.migrations(), 2);
    }

    #[test]
    fn test_processor_stats_count_completions() {
        let mut p = Processor::new(ProcessorId(4));
        p.enqueue(Task::new(TaskId(0), 0, 1));
        p.enqueue(Task::new(TaskId(1), 0, 2));
        for t in 0..4 {
            p.tick(t).unwrap();
        }

        let stats = ProcessorStats::from(&p);
        assert_eq!(stats.id, ProcessorId(4));
        assert_eq!(stats.tasks_completed, 2);
        assert_eq!(stats.busy_ticks, 3);
        assert_eq!(stats.idle_ticks, 1);
    }
}
