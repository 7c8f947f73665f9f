//! Task representation and execution.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One discrete unit of simulated time.
pub type Tick = u64;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A unit of simulated work.
///
/// `length` and `arrival` never change after creation. `remaining` only ever
/// decreases, and `completed_at` is set exactly once, on the tick that brings
/// `remaining` to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    arrival: Tick,
    length: u64,
    remaining: u64,
    started_at: Option<Tick>,
    completed_at: Option<Tick>,
    migrations: u32,
}

impl Task {
    /// Create a task arriving at `arrival` that needs `length` ticks of execution.
    pub fn new(id: TaskId, arrival: Tick, length: u64) -> Self {
        Task {
            id,
            arrival,
            length,
            remaining: length,
            started_at: None,
            completed_at: None,
            migrations: 0,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn arrival(&self) -> Tick {
        self.arrival
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn started_at(&self) -> Option<Tick> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<Tick> {
        self.completed_at
    }

    /// Number of times this task changed owner.
    pub fn migrations(&self) -> u32 {
        self.migrations
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Record the first execution start. Later calls are ignored.
    pub(crate) fn mark_started(&mut self, now: Tick) -> bool {
        if self.started_at.is_none() {
            self.started_at = Some(now);
            true
        } else {
            false
        }
    }

    pub(crate) fn mark_migrated(&mut self) {
        self.migrations += 1;
    }

    /// Execute one unit of work during tick `now`.
    ///
    /// Returns `true` when this unit finished the task. The completion time is
    /// the end of the tick, `now + 1`.
    pub(crate) fn execute_unit(&mut self, now: Tick) -> Result<bool> {
        if self.remaining == 0 || self.completed_at.is_some() {
            return Err(Error::invariant(format!(
                "task {} executed after completion",
                self.id
            )));
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.completed_at = Some(now + 1);
            return Ok(true);
        }
        Ok(false)
    }

    /// Execution start minus arrival.
    pub fn waiting_time(&self) -> Option<u64> {
        self.started_at.map(|s| s.saturating_sub(self.arrival))
    }

    /// Completion minus arrival.
    pub fn turnaround_time(&self) -> Option<u64> {
        self.completed_at.map(|c| c.saturating_sub(self.arrival))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_lifecycle() {
        let mut task = Task::new(TaskId(1), 2, 3);
        assert_eq!(task.remaining(), 3);
        assert!(task.mark_started(4));
        assert!(!task.mark_started(5));
        assert_eq!(task.started_at(), Some(4));

        assert!(!task.execute_unit(4).unwrap());
        assert!(!task.execute_unit(5).unwrap());
        assert!(task.execute_unit(6).unwrap());

        assert_eq!(task.remaining(), 0);
        assert_eq!(task.completed_at(), Some(7));
        assert_eq!(task.waiting_time(), Some(2));
        assert_eq!(task.turnaround_time(), Some(5));
    }

    #[test]
    fn test_execute_after_completion_is_violation() {
        let mut task = Task::new(TaskId(7), 0, 1);
        task.mark_started(0);
        assert!(task.execute_unit(0).unwrap());

        let err = task.execute_unit(1).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(task.completed_at(), Some(1));
    }

    #[test]
    fn test_unstarted_task_has_no_times() {
        let task = Task::new(TaskId(0), 0, 5);
        assert_eq!(task.waiting_time(), None);
        assert_eq!(task.turnaround_time(), None);
        assert!(!task.is_complete());
    }
}
