use super::{loads, migrate, Balancer, Migration, MigrationKind};
use crate::executor::{Processor, Tick};
use tracing::debug;

/// Peer-to-peer stealing: idle processors pull work from the busiest peer.
///
/// There is no shared state between processors. Each thief only reads its
/// peers' loads, and thieves act one at a time in ascending id so a run is
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct WorkStealingBalancer {
    steals: u64,
    failed_attempts: u64,
}

impl WorkStealingBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steals(&self) -> u64 {
        self.steals
    }

    /// Idle ticks where every peer had nothing migratable.
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts
    }

    /// Online peers of `thief` that have queued work, busiest first.
    fn victims(processors: &[Processor], thief: usize) -> Vec<usize> {
        let current = loads(processors);
        let mut peers: Vec<usize> = (0..processors.len())
            .filter(|&i| i != thief && processors[i].is_online())
            // the peer's own in-flight task is not up for grabs
            .filter(|&i| processors[i].queue_len() > 0)
            .collect();
        // sort_by is stable, so equal loads keep ascending id order
        peers.sort_by(|&a, &b| current[b].cmp(&current[a]));
        peers
    }

    fn try_steal(&mut self, processors: &mut [Processor], thief: usize, now: Tick) -> Option<Migration> {
        for victim in Self::victims(processors, thief) {
            if let Some(m) = migrate(processors, victim, thief, now, MigrationKind::Steal) {
                self.steals += 1;
                debug!(tick = now, task = %m.task, thief = %m.to, victim = %m.from, "stole task");
                return Some(m);
            }
        }
        self.failed_attempts += 1;
        None
    }
}

impl Balancer for WorkStealingBalancer {
    fn rebalance(&mut self, processors: &mut [Processor], now: Tick) -> Vec<Migration> {
        let mut migrations = Vec::new();

        for thief in 0..processors.len() {
            let p = &processors[thief];
            if !p.is_online() || !p.is_idle() {
                continue;
            }
            if let Some(m) = self.try_steal(processors, thief, now) {
                migrations.push(m);
            }
        }

        migrations
    }

    fn name(&self) -> &'static str {
        "work-stealing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Task, TaskId};
    use crate::scheduler::ProcessorId;

    fn processors(n: usize) -> Vec<Processor> {
        (0..n).map(|i| Processor::new(ProcessorId(i))).collect()
    }

    fn fill(p: &mut Processor, first_id: u64, count: u64, length: u64) {
        for i in 0..count {
            p.enqueue(Task::new(TaskId(first_id + i), 0, length));
        }
    }

    #[test]
    fn test_idle_processors_steal_in_id_order() {
        let mut procs = processors(3);
        fill(&mut procs[0], 0, 5, 3);

        let mut ws = WorkStealingBalancer::new();
        let moves = ws.rebalance(&mut procs, 0);

        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].to, ProcessorId(1));
        assert_eq!(moves[0].task, TaskId(4));
        assert_eq!(moves[1].to, ProcessorId(2));
        assert_eq!(moves[1].task, TaskId(3));
        assert_eq!(procs[0].load(), 3);
        assert_eq!(ws.steals(), 2);
    }

    #[test]
    fn test_busy_processors_do_not_steal() {
        let mut procs = processors(2);
        fill(&mut procs[0], 0, 4, 2);
        fill(&mut procs[1], 10, 1, 2);

        let moves = WorkStealingBalancer::new().rebalance(&mut procs, 0);
        assert!(moves.is_empty());
    }

    #[test]
    fn test_picks_busiest_peer() {
        let mut procs = processors(4);
        fill(&mut procs[1], 0, 2, 1);
        fill(&mut procs[2], 10, 4, 1);
        fill(&mut procs[3], 20, 4, 1);

        let moves = WorkStealingBalancer::new().rebalance(&mut procs, 0);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from, ProcessorId(2));
        assert_eq!(moves[0].to, ProcessorId(0));
    }

    #[test]
    fn test_falls_through_to_next_victim() {
        let mut procs = processors(3);
        // P1: executing + one queued (load 2, nothing migratable)
        fill(&mut procs[1], 0, 2, 5);
        procs[1].tick(0).unwrap();
        // P2: two queued (load 2, one migratable)
        fill(&mut procs[2], 10, 2, 5);

        let moves = WorkStealingBalancer::new().rebalance(&mut procs, 1);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from, ProcessorId(2));
    }

    #[test]
    fn test_nothing_to_steal() {
        let mut procs = processors(2);
        fill(&mut procs[0], 0, 1, 5);

        let mut ws = WorkStealingBalancer::new();
        assert!(ws.rebalance(&mut procs, 0).is_empty());
        assert_eq!(ws.failed_attempts(), 1);
    }
}
