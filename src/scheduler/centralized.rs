use super::{loads, migrate, Balancer, Migration, MigrationKind};
use crate::config::Config;
use crate::executor::{Processor, Tick};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct CentralizedConfig {
    /// Run a pass every `interval` ticks.
    pub interval: u64,
    /// Largest tolerated max-min load gap.
    pub imbalance_threshold: usize,
}

impl From<&Config> for CentralizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.rebalance_interval,
            imbalance_threshold: config.imbalance_threshold,
        }
    }
}

impl Default for CentralizedConfig {
    fn default() -> Self {
        Self {
            interval: 5,
            imbalance_threshold: 1,
        }
    }
}

/// Least-loaded migration driven from a single global view.
#[derive(Debug, Clone)]
pub struct CentralizedBalancer {
    config: CentralizedConfig,
    passes: u64,
}

impl CentralizedBalancer {
    pub fn new(config: CentralizedConfig) -> Self {
        Self { config, passes: 0 }
    }

    pub fn config(&self) -> &CentralizedConfig {
        &self.config
    }

    /// Passes that actually ran (interval hits), including no-op ones.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    fn is_due(&self, now: Tick) -> bool {
        self.config.interval > 0 && now % self.config.interval == 0
    }

    /// Most and least loaded online processors; lowest index wins ties.
    fn extremes(processors: &[Processor], loads: &[usize]) -> Option<(usize, usize)> {
        let mut max: Option<usize> = None;
        let mut min: Option<usize> = None;

        for (i, p) in processors.iter().enumerate() {
            if !p.is_online() {
                continue;
            }
            if max.map_or(true, |m| loads[i] > loads[m]) {
                max = Some(i);
            }
            if min.map_or(true, |m| loads[i] < loads[m]) {
                min = Some(i);
            }
        }

        match (max, min) {
            (Some(max), Some(min)) if max != min => Some((max, min)),
            _ => None,
        }
    }
}

impl Balancer for CentralizedBalancer {
    fn rebalance(&mut self, processors: &mut [Processor], now: Tick) -> Vec<Migration> {
        if !self.is_due(now) {
            return Vec::new();
        }
        self.passes += 1;

        let mut migrations = Vec::new();
        let mut last: Option<(usize, usize, usize, usize)> = None;

        // at most P moves per pass
        for _ in 0..processors.len() {
            let current = loads(processors);
            let Some((max, min)) = Self::extremes(processors, &current) else {
                break;
            };

            let gap = current[max] - current[min];
            // a move on a gap of 1 just swaps the roles of the pair
            if gap <= self.config.imbalance_threshold || gap < 2 {
                break;
            }

            let key = (max, min, current[max], current[min]);
            if last == Some(key) {
                break;
            }
            last = Some(key);

            match migrate(processors, max, min, now, MigrationKind::Rebalance) {
                Some(m) => {
                    debug!(
                        tick = now,
                        task = %m.task,
                        from = %m.from,
                        to = %m.to,
                        gap,
                        "rebalanced task"
                    );
                    migrations.push(m);
                }
                None => {
                    trace!(tick = now, from = max, "most loaded processor has nothing migratable");
                    break;
                }
            }
        }

        migrations
    }

    fn name(&self) -> &'static str {
        "centralized"
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

    fn balancer(interval: u64, threshold: usize) -> CentralizedBalancer {
        CentralizedBalancer::new(CentralizedConfig {
            interval,
            imbalance_threshold: threshold,
        })
    }

    #[test]
    fn test_splits_four_tasks_evenly() {
        let mut procs = processors(2);
        fill(&mut procs[0], 0, 4, 1);

        let moves = balancer(1, 1).rebalance(&mut procs, 0);
        assert_eq!(moves.len(), 2);
        assert_eq!(procs[0].queue_len(), 2);
        assert_eq!(procs[1].queue_len(), 2);
        assert!(moves.iter().all(|m| m.kind == MigrationKind::Rebalance));
    }

    #[test]
    fn test_gap_within_threshold_after_pass() {
        let mut procs = processors(4);
        fill(&mut procs[1], 0, 6, 2);
        fill(&mut procs[3], 100, 2, 2);

        let threshold = 2;
        balancer(1, threshold).rebalance(&mut procs, 0);

        let l = loads(&procs);
        let gap = l.iter().max().unwrap() - l.iter().min().unwrap();
        assert!(gap <= threshold, "loads {:?}", l);
    }

    #[test]
    fn test_respects_interval() {
        let mut procs = processors(2);
        fill(&mut procs[0], 0, 6, 1);

        let mut b = balancer(5, 1);
        assert!(b.rebalance(&mut procs, 3).is_empty());
        assert_eq!(b.passes(), 0);
        assert!(!b.rebalance(&mut procs, 5).is_empty());
        assert_eq!(b.passes(), 1);
    }

    #[test]
    fn test_empty_processors_noop() {
        let mut procs = processors(3);
        assert!(balancer(1, 0).rebalance(&mut procs, 0).is_empty());
    }

    #[test]
    fn test_stops_when_nothing_migratable() {
        let mut procs = processors(2);
        fill(&mut procs[0], 0, 2, 5);
        procs[0].tick(0).unwrap();
        // P0: one executing, one queued -> load 2, nothing migratable
        let moves = balancer(1, 1).rebalance(&mut procs, 1);
        assert!(moves.is_empty());
        assert_eq!(procs[0].load(), 2);
    }

    #[test]
    fn test_ties_pick_lowest_ids() {
        let mut procs = processors(4);
        fill(&mut procs[1], 0, 4, 1);
        fill(&mut procs[2], 10, 4, 1);

        let moves = balancer(1, 1).rebalance(&mut procs, 0);
        assert_eq!(moves[0].from, ProcessorId(1));
        assert_eq!(moves[0].to, ProcessorId(0));
    }

    #[test]
    fn test_pass_bounded_by_processor_count() {
        let mut procs = processors(2);
        fill(&mut procs[0], 0, 20, 1);

        let moves = balancer(1, 0).rebalance(&mut procs, 0);
        assert!(moves.len() <= 2);
    }

    #[test]
    fn test_skips_offline_processors() {
        let mut procs = processors(3);
        fill(&mut procs[0], 0, 4, 1);
        procs[1].set_online(false);

        balancer(1, 1).rebalance(&mut procs, 0);
        assert_eq!(procs[1].queue_len(), 0);
        assert_eq!(procs[2].queue_len(), 2);
    }
}
