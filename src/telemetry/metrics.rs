//! Live counters updated while a simulation runs.

use crate::scheduler::MigrationKind;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Runtime metrics shared with observers through an `Arc`
#[derive(Debug)]
pub struct Metrics {
    // Task counters
    tasks_generated: AtomicU64,
    tasks_completed: AtomicU64,
    rebalance_migrations: AtomicU64,
    steals: AtomicU64,

    // Processor-ticks
    busy_ticks: AtomicU64,
    idle_ticks: AtomicU64,
    ticks: AtomicU64,

    turnaround_histogram: RwLock<Histogram<u64>>,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        // auto-resizing, 3 significant figures
        let histogram = Histogram::new(3).expect("3 significant figures is a valid histogram precision");

        Self {
            tasks_generated: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            rebalance_migrations: AtomicU64::new(0),
            steals: AtomicU64::new(0),
            busy_ticks: AtomicU64::new(0),
            idle_ticks: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            turnaround_histogram: RwLock::new(histogram),
        }
    }

    pub fn record_generated(&self) {
        self.tasks_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed task with its turnaround in ticks
    pub fn record_completion(&self, turnaround: u64) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        let _ = self.turnaround_histogram.write().record(turnaround);
    }

    pub fn record_migration(&self, kind: MigrationKind) {
        match kind {
            MigrationKind::Rebalance => self.rebalance_migrations.fetch_add(1, Ordering::Relaxed),
            MigrationKind::Steal => self.steals.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record one processor-tick
    pub fn record_processor_tick(&self, busy: bool) {
        if busy {
            self.busy_ticks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.idle_ticks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.turnaround_histogram.read();
        let empty = histogram.len() == 0;

        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            tasks_generated: self.tasks_generated.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            rebalance_migrations: self.rebalance_migrations.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            busy_ticks: self.busy_ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            avg_turnaround: if empty { 0.0 } else { histogram.mean() },
            p50_turnaround: histogram.value_at_quantile(0.50),
            p95_turnaround: histogram.value_at_quantile(0.95),
            p99_turnaround: histogram.value_at_quantile(0.99),
            max_turnaround: histogram.max(),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.tasks_generated.store(0, Ordering::Relaxed);
        self.tasks_completed.store(0, Ordering::Relaxed);
        self.rebalance_migrations.store(0, Ordering::Relaxed);
        self.steals.store(0, Ordering::Relaxed);
        self.busy_ticks.store(0, Ordering::Relaxed);
        self.idle_ticks.store(0, Ordering::Relaxed);
        self.ticks.store(0, Ordering::Relaxed);
        self.turnaround_histogram.write().reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub tasks_generated: u64,
    pub tasks_completed: u64,
    pub rebalance_migrations: u64,
    pub steals: u64,
    pub busy_ticks: u64,
    pub idle_ticks: u64,
    pub avg_turnaround: f64,
    pub p50_turnaround: u64,
    pub p95_turnaround: u64,
    pub p99_turnaround: u64,
    pub max_turnaround: u64,
}

impl MetricsSnapshot {
    /// Busy share of all processor-ticks so far (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        let total = self.busy_ticks + self.idle_ticks;
        if total == 0 {
            return 0.0;
        }
        self.busy_ticks as f64 / total as f64
    }

    /// Tasks generated but not yet completed
    pub fn in_flight(&self) -> u64 {
        self.tasks_generated.saturating_sub(self.tasks_completed)
    }

    pub fn throughput(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.tasks_completed as f64 / self.ticks as f64
    }
}
