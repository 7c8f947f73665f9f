//! Final run report derived from a [`RunHistory`].

use crate::config::BalancingStrategy;
use crate::engine::{RunHistory, RunOutcome};
use crate::executor::Tick;
use crate::scheduler::ProcessorId;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorReport {
    pub id: ProcessorId,
    pub busy_ticks: u64,
    pub idle_ticks: u64,
    /// busy / elapsed
    pub utilization: f64,
    pub tasks_completed: u64,
    pub migrated_in: u64,
    pub migrated_out: u64,
}

/// Dispersion of per-processor queue lengths over the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadImbalance {
    /// Max minus min queue length, one entry per tick.
    pub spread_series: Vec<usize>,
    pub mean_spread: f64,
    pub max_spread: usize,
    /// Standard deviation of queue lengths, averaged over ticks.
    pub mean_std_dev: f64,
}

/// Turnaround distribution in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnaroundPercentiles {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub strategy: BalancingStrategy,
    pub processor_count: usize,
    pub ticks_elapsed: Tick,
    pub outcome: RunOutcome,
    pub tasks_generated: u64,
    pub tasks_completed: u64,
    pub rebalance_migrations: u64,
    pub steals: u64,
    pub processors: Vec<ProcessorReport>,
    pub average_utilization: f64,
    /// `None` when no task completed.
    pub average_waiting_time: Option<f64>,
    pub average_turnaround_time: Option<f64>,
    pub turnaround_percentiles: Option<TurnaroundPercentiles>,
    pub load_imbalance: LoadImbalance,
}

impl MetricsReport {
    pub fn utilization_of(&self, id: ProcessorId) -> Option<f64> {
        self.processors.iter().find(|p| p.id == id).map(|p| p.utilization)
    }

    pub fn migrations(&self) -> u64 {
        self.rebalance_migrations + self.steals
    }
}

/// Derives a [`MetricsReport`] from recorded history. Pure; never mutates its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn collect(history: &RunHistory) -> MetricsReport {
        let elapsed = history.ticks_elapsed;

        let processors: Vec<ProcessorReport> = history
            .processors
            .iter()
            .map(|p| ProcessorReport {
                id: p.id,
                busy_ticks: p.busy_ticks,
                idle_ticks: p.idle_ticks,
                utilization: ratio(p.busy_ticks, elapsed),
                tasks_completed: p.tasks_completed,
                migrated_in: p.migrated_in,
                migrated_out: p.migrated_out,
            })
            .collect();

        let average_utilization = if processors.is_empty() {
            0.0
        } else {
            processors.iter().map(|p| p.utilization).sum::<f64>() / processors.len() as f64
        };

        let waits: Vec<u64> = history.completed.iter().filter_map(|t| t.waiting_time()).collect();
        let turnarounds: Vec<u64> = history
            .completed
            .iter()
            .filter_map(|t| t.turnaround_time())
            .collect();

        MetricsReport {
            strategy: history.strategy,
            processor_count: history.processor_count,
            ticks_elapsed: elapsed,
            outcome: history.outcome.unwrap_or(RunOutcome::Completed),
            tasks_generated: history.tasks_generated,
            tasks_completed: history.completed.len() as u64,
            rebalance_migrations: history.rebalance_migrations,
            steals: history.steals,
            processors,
            average_utilization,
            average_waiting_time: mean(&waits),
            average_turnaround_time: mean(&turnarounds),
            turnaround_percentiles: percentiles(&turnarounds),
            load_imbalance: Self::load_imbalance(history),
        }
    }

    fn load_imbalance(history: &RunHistory) -> LoadImbalance {
        if history.snapshots.is_empty() {
            return LoadImbalance::default();
        }

        let spread_series: Vec<usize> = history.snapshots.iter().map(|s| s.spread()).collect();
        let n = spread_series.len() as f64;
        let mean_spread = spread_series.iter().sum::<usize>() as f64 / n;
        let max_spread = spread_series.iter().copied().max().unwrap_or(0);

        let mean_std_dev = history
            .snapshots
            .iter()
            .map(|s| std_dev(&s.queue_lengths))
            .sum::<f64>()
            / n;

        LoadImbalance {
            spread_series,
            mean_spread,
            max_spread,
            mean_std_dev,
        }
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<u64>() as f64 / values.len() as f64)
}

fn std_dev(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

fn percentiles(values: &[u64]) -> Option<TurnaroundPercentiles> {
    if values.is_empty() {
        return None;
    }
    let mut histogram: Histogram<u64> = Histogram::new(3).ok()?;
    for &v in values {
        histogram.record(v).ok()?;
    }
    Some(TurnaroundPercentiles {
        p50: histogram.value_at_quantile(0.50),
        p95: histogram.value_at_quantile(0.95),
        p99: histogram.value_at_quantile(0.99),
        max: histogram.max(),
    })
}
