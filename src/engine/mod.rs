//! Simulation engine.
//!
//! The engine owns the clock, the processors, the generator and the active
//! balancer, and drives them through a fixed per-tick sequence:
//!
//! 1. apply processor faults scheduled for this tick
//! 2. generate arrivals and assign each to a processor
//! 3. run the balancer
//! 4. tick every processor in ascending id order
//! 5. check task ownership invariants and record a snapshot
//!
//! Everything is single-threaded and seeded, so a configuration always
//! produces the same run.

pub mod clock;
pub mod history;

pub use clock::SimClock;
pub use history::{ProcessorStats, RunHistory, RunOutcome, TickSnapshot};

use crate::config::{AssignmentPolicy, Config, FaultEvent, FaultKind};
use crate::error::{Error, Result};
use crate::executor::{Processor, Task, TaskId, Tick};
use crate::scheduler::{Balancer, BalancerKind, ExecutionTrace, ProcessorId, TraceEvent};
use crate::telemetry::{Metrics, MetricsCollector, MetricsReport};
use crate::workload::TaskGenerator;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Finished,
}

pub struct Engine {
    config: Config,
    state: EngineState,
    clock: SimClock,
    generator: TaskGenerator,
    processors: Vec<Processor>,
    balancer: BalancerKind,
    // tasks waiting for any processor to come online
    backlog: VecDeque<Task>,
    faults: Vec<FaultEvent>,
    next_fault: usize,
    next_round_robin: usize,
    history: RunHistory,
    metrics: Arc<Metrics>,
    trace: Option<ExecutionTrace>,
}

impl Engine {
    /// Build an engine. Invalid configurations are rejected before anything is constructed.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let processors = (0..config.processor_count)
            .map(|i| Processor::new(ProcessorId(i)))
            .collect();
        let generator = TaskGenerator::with_seed(
            config.arrival.clone(),
            config.seed,
            config.processor_count,
            config.tick_budget,
            config.max_tasks,
        );
        let balancer = BalancerKind::from_config(&config);

        let mut faults = config.faults.clone();
        // stable: same-tick faults apply in listed order
        faults.sort_by_key(|f| f.tick);

        Ok(Self {
            state: EngineState::Idle,
            clock: SimClock::new(),
            generator,
            processors,
            balancer,
            backlog: VecDeque::new(),
            faults,
            next_fault: 0,
            next_round_robin: 0,
            history: RunHistory::new(config.strategy, config.processor_count),
            metrics: Arc::new(Metrics::new()),
            trace: config.record_trace.then(ExecutionTrace::new),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    /// Live counters; the handle stays valid after the engine is dropped.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn trace(&self) -> Option<&ExecutionTrace> {
        self.trace.as_ref()
    }

    pub fn balancer(&self) -> &BalancerKind {
        &self.balancer
    }

    /// Tasks generated so far.
    pub fn tasks_generated(&self) -> u64 {
        self.generator.generated()
    }

    /// Tasks queued, executing, or waiting in the backlog.
    pub fn outstanding(&self) -> usize {
        self.processors.iter().map(Processor::load).sum::<usize>() + self.backlog.len()
    }

    /// Budget reached, generator exhausted and every processor idle.
    pub fn is_terminal(&self) -> bool {
        let now = self.clock.now();
        now >= self.config.tick_budget && self.generator.is_exhausted(now) && self.outstanding() == 0
    }

    fn should_continue(&self) -> bool {
        let now = self.clock.now();
        if now < self.config.tick_budget {
            return true;
        }
        // u64::MAX drain ticks means drain until done
        let limit = self.config.tick_budget.saturating_add(self.config.max_drain_ticks);
        self.outstanding() > 0 && now < limit
    }

    /// Run to completion and compute the report.
    pub fn run(&mut self) -> Result<MetricsReport> {
        if self.state == EngineState::Finished {
            return Err(Error::invalid_state("engine already finished"));
        }

        info!(
            strategy = %self.config.strategy,
            processors = self.config.processor_count,
            tick_budget = self.config.tick_budget,
            seed = self.config.seed,
            "starting simulation"
        );

        while self.should_continue() {
            self.step()?;
        }

        #[cfg(debug_assertions)]
        if let Err(e) = self.check_completed_unique() {
            error!(error = %e, "simulation aborted");
            self.state = EngineState::Finished;
            return Err(e);
        }

        Ok(self.finish())
    }

    /// Advance the simulation by exactly one tick.
    pub fn step(&mut self) -> Result<()> {
        match self.state {
            EngineState::Finished => return Err(Error::invalid_state("engine already finished")),
            EngineState::Idle => self.state = EngineState::Running,
            EngineState::Running => {}
        }

        let now = self.clock.now();
        if let Err(e) = self.step_at(now) {
            if e.is_fatal() {
                error!(tick = now, error = %e, "simulation aborted");
                self.state = EngineState::Finished;
            }
            return Err(e);
        }

        self.clock.advance();
        self.history.ticks_elapsed = self.clock.now();
        self.metrics.record_tick();
        Ok(())
    }

    fn step_at(&mut self, now: Tick) -> Result<()> {
        self.apply_faults(now);
        self.flush_backlog(now);

        for arrival in self.generator.generate(now) {
            self.metrics.record_generated();
            self.record(TraceEvent::TaskArrived {
                task_id: arrival.task.id(),
                origin: arrival.origin,
                length: arrival.task.length(),
                tick: now,
            });
            self.dispatch(arrival.task, Some(arrival.origin), now);
        }
        self.history.tasks_generated = self.generator.generated();

        let migrations = self.balancer.rebalance(&mut self.processors, now);
        for m in &migrations {
            self.metrics.record_migration(m.kind);
            if let Some(trace) = self.trace.as_mut() {
                trace.record_migration(m);
            }
        }
        self.history.record_migrations(&migrations);

        for i in 0..self.processors.len() {
            let report = self.processors[i].tick(now)?;
            let processor = self.processors[i].id();
            self.metrics.record_processor_tick(report.busy);

            if let Some(task_id) = report.started {
                self.record(TraceEvent::TaskStarted {
                    task_id,
                    processor,
                    tick: now,
                });
            }
            if let Some(task) = report.completed {
                self.metrics.record_completion(task.turnaround_time().unwrap_or(0));
                self.record(TraceEvent::TaskCompleted {
                    task_id: task.id(),
                    processor,
                    tick: now,
                });
                self.history.completed.push(task);
            }
        }

        self.check_invariants()?;

        let snapshot = TickSnapshot::capture(now, &self.processors);
        trace!(tick = now, queues = ?snapshot.queue_lengths, "tick complete");
        self.history.snapshots.push(snapshot);
        Ok(())
    }

    fn finish(&mut self) -> MetricsReport {
        self.state = EngineState::Finished;

        let remaining = self.outstanding();
        let outcome = if remaining > 0 {
            warn!(
                remaining,
                ticks = self.clock.now(),
                "tick budget exhausted with tasks outstanding"
            );
            RunOutcome::NonTerminating { remaining }
        } else {
            RunOutcome::Completed
        };

        self.history.outcome = Some(outcome);
        self.history.ticks_elapsed = self.clock.now();
        self.history.tasks_generated = self.generator.generated();
        self.history.processors = self.processors.iter().map(ProcessorStats::from).collect();

        let report = MetricsCollector::collect(&self.history);
        info!(
            strategy = %report.strategy,
            ticks = report.ticks_elapsed,
            completed = report.tasks_completed,
            migrations = report.migrations(),
            utilization = report.average_utilization,
            "simulation finished"
        );
        report
    }

    fn apply_faults(&mut self, now: Tick) {
        while let Some(fault) = self.faults.get(self.next_fault).copied() {
            if fault.tick > now {
                break;
            }
            self.next_fault += 1;

            let processor = ProcessorId(fault.processor);
            match fault.kind {
                FaultKind::Fail => {
                    if !self.processors[fault.processor].is_online() {
                        continue;
                    }
                    self.processors[fault.processor].set_online(false);
                    let orphans = self.processors[fault.processor].drain_queue();
                    warn!(tick = now, processor = %processor, requeued = orphans.len(), "processor failed");
                    self.record(TraceEvent::ProcessorFailed { processor, tick: now });
                    for task in orphans {
                        self.dispatch(task, None, now);
                    }
                }
                FaultKind::Recover => {
                    if self.processors[fault.processor].is_online() {
                        continue;
                    }
                    self.processors[fault.processor].set_online(true);
                    info!(tick = now, processor = %processor, "processor recovered");
                    self.record(TraceEvent::ProcessorRecovered { processor, tick: now });
                }
            }
        }
    }

    fn flush_backlog(&mut self, now: Tick) {
        if self.backlog.is_empty() || !self.processors.iter().any(Processor::is_online) {
            return;
        }
        debug!(tick = now, tasks = self.backlog.len(), "dispatching backlog");
        while let Some(task) = self.backlog.pop_front() {
            self.dispatch(task, None, now);
        }
    }

    /// Queue a task on the processor picked by the assignment policy.
    fn dispatch(&mut self, task: Task, origin: Option<ProcessorId>, now: Tick) {
        let Some(target) = self.select_processor(origin) else {
            trace!(tick = now, task = %task.id(), "no processor online, task held in backlog");
            self.backlog.push_back(task);
            return;
        };

        self.record(TraceEvent::TaskAssigned {
            task_id: task.id(),
            processor: ProcessorId(target),
            tick: now,
        });
        self.processors[target].enqueue(task);
    }

    fn select_processor(&mut self, origin: Option<ProcessorId>) -> Option<usize> {
        match self.config.assignment {
            AssignmentPolicy::ShortestQueue => self.shortest_queue(),
            AssignmentPolicy::RoundRobin => {
                let n = self.processors.len();
                for offset in 0..n {
                    let i = (self.next_round_robin + offset) % n;
                    if self.processors[i].is_online() {
                        self.next_round_robin = (i + 1) % n;
                        return Some(i);
                    }
                }
                None
            }
            AssignmentPolicy::Origin => match origin {
                Some(ProcessorId(i)) if self.processors.get(i).map_or(false, Processor::is_online) => {
                    Some(i)
                }
                _ => self.shortest_queue(),
            },
        }
    }

    fn shortest_queue(&self) -> Option<usize> {
        self.processors
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_online())
            // min_by_key keeps the first of equal minima
            .min_by_key(|(_, p)| p.load())
            .map(|(i, _)| i)
    }

    fn record(&mut self, event: TraceEvent) {
        if let Some(trace) = self.trace.as_mut() {
            trace.record(event);
        }
    }

    /// Every generated task is completed, queued, executing or backlogged, exactly once.
    ///
    /// Completed tasks never re-enter a queue, so ownership is only checked
    /// over live tasks; the completed list enters through the count.
    fn check_invariants(&self) -> Result<()> {
        let live = self.outstanding();
        let accounted = self.history.completed.len() + live;
        let generated = self.generator.generated();
        if accounted as u64 != generated {
            return Err(Error::invariant(format!(
                "{} tasks generated but {} accounted for",
                generated, accounted
            )));
        }

        let mut seen: HashSet<TaskId> = HashSet::with_capacity(live);
        let owned = self
            .processors
            .iter()
            .flat_map(|p| p.current().into_iter().chain(p.queued()))
            .chain(self.backlog.iter());
        for task in owned {
            if !seen.insert(task.id()) {
                return Err(Error::invariant(format!("task {} owned twice", task.id())));
            }
        }

        Ok(())
    }

    /// Full ownership check over the completed list too. Debug builds only.
    #[cfg(debug_assertions)]
    fn check_completed_unique(&self) -> Result<()> {
        let mut seen: HashSet<TaskId> = HashSet::with_capacity(self.history.completed.len());
        for task in &self.history.completed {
            if !seen.insert(task.id()) {
                return Err(Error::invariant(format!("task {} completed twice", task.id())));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("now", &self.clock.now())
            .field("strategy", &self.config.strategy)
            .field("processors", &self.processors.len())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BalancingStrategy;
    use crate::workload::{ArrivalPolicy, TraceArrival};

    fn trace_config(
        strategy: BalancingStrategy,
        processors: usize,
        arrivals: Vec<TraceArrival>,
        budget: Tick,
    ) -> Config {
        Config::builder()
            .processor_count(processors)
            .strategy(strategy)
            .assignment(AssignmentPolicy::Origin)
            .arrival(ArrivalPolicy::trace(arrivals))
            .tick_budget(budget)
            .rebalance_interval(1)
            .imbalance_threshold(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_engine_state_machine() {
        let config = Config::builder().tick_budget(3).build().unwrap();
        let mut engine = Engine::new(config).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);

        engine.step().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.now(), 1);

        engine.run().unwrap();
        assert_eq!(engine.state(), EngineState::Finished);
        assert!(engine.step().is_err());
        assert!(engine.run().is_err());
    }

    #[test]
    fn test_invalid_config_never_builds_engine() {
        let config = Config {
            processor_count: 0,
            ..Config::default()
        };
        assert!(matches!(Engine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_centralized_splits_burst_on_one_processor() {
        let arrivals = (0..4).map(|_| TraceArrival::new(0, 1).on(0)).collect();
        let config = trace_config(BalancingStrategy::Centralized, 2, arrivals, 2);
        let mut engine = Engine::new(config).unwrap();

        engine.step().unwrap();
        // each processor ran one task and holds one more
        assert_eq!(engine.processors()[0].queue_len(), 1);
        assert_eq!(engine.processors()[1].queue_len(), 1);

        let report = engine.run().unwrap();
        assert!(report.outcome.is_complete());
        assert_eq!(report.tasks_completed, 4);
        assert_eq!(report.rebalance_migrations, 2);
        assert_eq!(report.processors[0].utilization, report.processors[1].utilization);
    }

    #[test]
    fn test_work_stealing_first_tick() {
        let arrivals = (0..5).map(|_| TraceArrival::new(0, 3).on(0)).collect();
        let config = trace_config(BalancingStrategy::WorkStealing, 3, arrivals, 1);
        let mut engine = Engine::new(config).unwrap();

        engine.step().unwrap();
        let p = engine.processors();
        assert_eq!(p[0].load(), 3);
        assert!(p[1].is_executing());
        assert!(p[2].is_executing());
        assert_eq!(engine.history().steals, 2);
    }

    #[test]
    fn test_backlog_when_all_offline() {
        let config = Config::builder()
            .processor_count(1)
            .arrival(ArrivalPolicy::trace(vec![TraceArrival::new(1, 1)]))
            .tick_budget(4)
            .fault(FaultEvent::fail(0, 0))
            .fault(FaultEvent::recover(2, 0))
            .record_trace(true)
            .build()
            .unwrap();
        let mut engine = Engine::new(config).unwrap();

        engine.step().unwrap();
        engine.step().unwrap();
        assert_eq!(engine.outstanding(), 1);
        assert_eq!(engine.processors()[0].load(), 0);

        let report = engine.run().unwrap();
        assert_eq!(report.tasks_completed, 1);
        let completed = &engine.history().completed[0];
        assert_eq!(completed.started_at(), Some(2));

        let trace = engine.trace().unwrap();
        assert!(trace
            .events()
            .iter()
            .any(|e| matches!(e, TraceEvent::ProcessorRecovered { tick: 2, .. })));
    }

    #[test]
    fn test_round_robin_assignment() {
        let config = Config::builder()
            .processor_count(3)
            .strategy(BalancingStrategy::Centralized)
            .assignment(AssignmentPolicy::RoundRobin)
            .rebalance_interval(1000)
            .arrival(ArrivalPolicy::Fixed {
                per_tick: 3,
                length: 10,
            })
            .tick_budget(1)
            .build()
            .unwrap();
        let mut engine = Engine::new(config).unwrap();
        engine.step().unwrap();
        // tick 0 is a rebalance tick, but loads are already even
        assert!(engine.processors().iter().all(|p| p.load() == 1));
    }

    #[test]
    fn test_unbounded_drain_runs_to_completion() {
        let config = Config::builder()
            .processor_count(2)
            .arrival(ArrivalPolicy::Fixed {
                per_tick: 1,
                length: 4,
            })
            .tick_budget(10)
            .max_drain_ticks(u64::MAX)
            .build()
            .unwrap();

        let report = Engine::new(config).unwrap().run().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.tasks_completed, 10);
        assert!(report.ticks_elapsed > 10);
    }

    #[test]
    fn test_duplicate_ownership_is_fatal() {
        let config = Config::builder()
            .processor_count(1)
            .arrival(ArrivalPolicy::Fixed {
                per_tick: 3,
                length: 5,
            })
            .tick_budget(10)
            .build()
            .unwrap();
        let mut engine = Engine::new(config).unwrap();
        engine.step().unwrap();

        let queued = engine.processors[0].queued().next().cloned().unwrap();
        engine.backlog.push_back(queued);

        assert!(matches!(engine.step(), Err(Error::InvariantViolation(_))));
        assert_eq!(engine.state(), EngineState::Finished);
        assert!(matches!(engine.step(), Err(Error::InvalidState(_))));
        assert!(engine.run().is_err());
    }

    #[test]
    fn test_live_duplicate_detected_by_ownership_check() {
        let config = Config::builder()
            .processor_count(2)
            .strategy(BalancingStrategy::Centralized)
            .imbalance_threshold(10)
            .assignment(AssignmentPolicy::Origin)
            .arrival(ArrivalPolicy::trace(vec![
                TraceArrival::new(0, 5).on(0),
                TraceArrival::new(0, 5).on(0),
                TraceArrival::new(0, 5).on(0),
            ]))
            .tick_budget(10)
            .build()
            .unwrap();
        let mut engine = Engine::new(config).unwrap();
        engine.step().unwrap();
        assert!(engine.check_invariants().is_ok());

        // swap a queued task for a copy of another: counts still balance
        let copy = engine.processors[0].queued().next().cloned().unwrap();
        engine.processors[0].drain_queue();
        engine.processors[0].enqueue(copy.clone());
        engine.processors[1].enqueue(copy);

        let err = engine.check_invariants().unwrap_err();
        assert!(err.to_string().contains("owned twice"));
    }
}
