// simulated processor: one ready queue, at most one executing task
use super::task::{Task, TaskId, Tick};
use crate::error::Result;
use crate::scheduler::ProcessorId;
use std::collections::VecDeque;

/// What happened on a processor during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub busy: bool,
    pub started: Option<TaskId>,
    pub completed: Option<Task>,
}

#[derive(Debug, Clone)]
pub struct Processor {
    id: ProcessorId,
    queue: VecDeque<Task>,
    current: Option<Task>,
    tasks_completed: u64,
    busy_ticks: u64,
    idle_ticks: u64,
    migrated_in: u64,
    migrated_out: u64,
    online: bool,
}

impl Processor {
    pub fn new(id: ProcessorId) -> Self {
        Self {
            id,
            queue: VecDeque::new(),
            current: None,
            tasks_completed: 0,
            busy_ticks: 0,
            idle_ticks: 0,
            migrated_in: 0,
            migrated_out: 0,
            online: true,
        }
    }

    pub fn id(&self) -> ProcessorId {
        self.id
    }

    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Reinsert at the head, ahead of everything already queued.
    pub fn enqueue_front(&mut self, task: Task) {
        self.queue.push_front(task);
    }

    /// Advance one tick.
    ///
    /// An idle processor first pulls the queue head, then whatever is executing
    /// runs one unit. Exactly one of the busy/idle counters moves per call.
    pub fn tick(&mut self, now: Tick) -> Result<TickReport> {
        let mut report = TickReport::default();

        if self.current.is_none() && self.online {
            if let Some(mut task) = self.queue.pop_front() {
                if task.mark_started(now) {
                    report.started = Some(task.id());
                }
                self.current = Some(task);
            }
        }

        let finished = match self.current.as_mut() {
            Some(task) => {
                report.busy = true;
                task.execute_unit(now)?
            }
            None => false,
        };

        if report.busy {
            self.busy_ticks += 1;
        } else {
            self.idle_ticks += 1;
        }

        if finished {
            if let Some(task) = self.current.take() {
                self.tasks_completed += 1;
                report.completed = Some(task);
            }
        }

        Ok(report)
    }

    /// Queued tasks only; the executing task is not counted.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue length plus one while a task is executing.
    pub fn load(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    pub fn is_executing(&self) -> bool {
        self.current.is_some()
    }

    /// No executing task and nothing queued.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Take the task furthest from the head for migration.
    ///
    /// The head is never handed out, so a queue holding at most one task
    /// yields nothing.
    pub fn remove_oldest_queued(&mut self) -> Option<Task> {
        if self.queue.len() <= 1 {
            return None;
        }
        self.queue.pop_back()
    }

    /// Move the back of this queue onto `dst`. Returns the migrated task id.
    pub(crate) fn migrate_to(&mut self, dst: &mut Processor) -> Option<TaskId> {
        let mut task = self.remove_oldest_queued()?;
        let id = task.id();
        task.mark_migrated();
        self.migrated_out += 1;
        dst.migrated_in += 1;
        dst.enqueue(task);
        Some(id)
    }

    /// Empty the ready queue, leaving any executing task in place.
    pub fn drain_queue(&mut self) -> Vec<Task> {
        self.queue.drain(..).collect()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Task> {
        self.queue.iter()
    }

    pub fn current(&self) -> Option<&Task> {
        self.current.as_ref()
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks
    }

    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    pub fn migrated_in(&self) -> u64 {
        self.migrated_in
    }

    pub fn migrated_out(&self) -> u64 {
        self.migrated_out
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub(crate) fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn utilization(&self) -> f64 {
        let total = self.busy_ticks + self.idle_ticks;
        if total == 0 {
            return 0.0;
        }
        self.busy_ticks as f64 / total as f64
    }
}
