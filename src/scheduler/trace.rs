//! Execution trace for deterministic replay and debugging.

use super::{Migration, MigrationKind, ProcessorId};
use crate::error::Result;
use crate::executor::{TaskId, Tick};
use serde::{Deserialize, Serialize};

/// Ordered record of everything that happened during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event
    pub fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn record_migration(&mut self, m: &Migration) {
        self.record(TraceEvent::TaskMigrated {
            task_id: m.task,
            from: m.from,
            to: m.to,
            tick: m.tick,
            kind: m.kind,
        });
    }

    /// Get all events
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every event that mentions `task`, in order.
    pub fn task_history(&self, task: TaskId) -> Vec<&TraceEvent> {
        self.events.iter().filter(|e| e.task_id() == Some(task)).collect()
    }

    /// Save trace to JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load trace from JSON file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Events that can be recorded in an execution trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    TaskArrived {
        task_id: TaskId,
        origin: ProcessorId,
        length: u64,
        tick: Tick,
    },
    TaskAssigned {
        task_id: TaskId,
        processor: ProcessorId,
        tick: Tick,
    },
    TaskStarted {
        task_id: TaskId,
        processor: ProcessorId,
        tick: Tick,
    },
    TaskCompleted {
        task_id: TaskId,
        processor: ProcessorId,
        tick: Tick,
    },
    TaskMigrated {
        task_id: TaskId,
        from: ProcessorId,
        to: ProcessorId,
        tick: Tick,
        kind: MigrationKind,
    },
    ProcessorFailed {
        processor: ProcessorId,
        tick: Tick,
    },
    ProcessorRecovered {
        processor: ProcessorId,
        tick: Tick,
    },
}

impl TraceEvent {
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            TraceEvent::TaskArrived { task_id, .. }
            | TraceEvent::TaskAssigned { task_id, .. }
            | TraceEvent::TaskStarted { task_id, .. }
            | TraceEvent::TaskCompleted { task_id, .. }
            | TraceEvent::TaskMigrated { task_id, .. } => Some(*task_id),
            TraceEvent::ProcessorFailed { .. } | TraceEvent::ProcessorRecovered { .. } => None,
        }
    }

    pub fn tick(&self) -> Tick {
        match self {
            TraceEvent::TaskArrived { tick, .. }
            | TraceEvent::TaskAssigned { tick, .. }
            | TraceEvent::TaskStarted { tick, .. }
            | TraceEvent::TaskCompleted { tick, .. }
            | TraceEvent::TaskMigrated { tick, .. }
            | TraceEvent::ProcessorFailed { tick, .. }
            | TraceEvent::ProcessorRecovered { tick, .. } => *tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_history() {
        let mut trace = ExecutionTrace::new();
        trace.record(TraceEvent::TaskAssigned {
            task_id: TaskId(0),
            processor: ProcessorId(0),
            tick: 0,
        });
        trace.record(TraceEvent::ProcessorFailed {
            processor: ProcessorId(1),
            tick: 0,
        });
        trace.record_migration(&Migration {
            task: TaskId(0),
            from: ProcessorId(0),
            to: ProcessorId(2),
            tick: 1,
            kind: MigrationKind::Steal,
        });

        assert_eq!(trace.len(), 3);
        let history = trace.task_history(TaskId(0));
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].tick(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let mut trace = ExecutionTrace::new();
        trace.record(TraceEvent::TaskCompleted {
            task_id: TaskId(9),
            processor: ProcessorId(3),
            tick: 12,
        });

        let path = std::env::temp_dir().join("loadsim_trace_test.json");
        trace.save(&path).unwrap();
        let loaded = ExecutionTrace::load(&path).unwrap();
        assert_eq!(loaded, trace);

        let _ = std::fs::remove_file(&path);
    }
}
