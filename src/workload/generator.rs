//! Seeded task generator.
//!
//! The generator is pulled once per tick and materializes only that tick's
//! arrivals. All randomness comes from the `Pcg64` it was built with, so two
//! generators with the same seed and policy emit identical streams.

use crate::error::{Error, Result};
use crate::executor::{Task, TaskId, Tick};
use crate::scheduler::ProcessorId;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// One pre-recorded arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceArrival {
    pub tick: Tick,
    pub length: u64,
    #[serde(default)]
    pub processor: Option<usize>,
}

impl TraceArrival {
    pub fn new(tick: Tick, length: u64) -> Self {
        Self {
            tick,
            length,
            processor: None,
        }
    }

    pub fn on(mut self, processor: usize) -> Self {
        self.processor = Some(processor);
        self
    }
}

/// How tasks arrive over simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ArrivalPolicy {
    /// `per_tick` tasks of `length` every tick.
    Fixed { per_tick: u32, length: u64 },

    /// Per-tick count and per-task length drawn uniformly from inclusive ranges.
    Uniform {
        min_tasks: u32,
        max_tasks: u32,
        min_length: u64,
        max_length: u64,
    },

    /// Mostly single arrivals with occasional bursts.
    Bursty {
        arrival_probability: f64,
        burst_probability: f64,
        burst_size: u32,
        min_length: u64,
        max_length: u64,
    },

    /// Explicit arrivals. Entries need not be sorted.
    Trace { arrivals: Vec<TraceArrival> },
}

impl Default for ArrivalPolicy {
    fn default() -> Self {
        ArrivalPolicy::Uniform {
            min_tasks: 0,
            max_tasks: 2,
            min_length: 1,
            max_length: 5,
        }
    }
}

impl ArrivalPolicy {
    pub fn trace(arrivals: Vec<TraceArrival>) -> Self {
        ArrivalPolicy::Trace { arrivals }
    }

    /// Check parameters against the system size and the tick after which
    /// nothing is generated.
    pub fn validate(&self, processor_count: usize, end_tick: Tick) -> Result<()> {
        match self {
            ArrivalPolicy::Fixed { length, .. } => {
                if *length == 0 {
                    return Err(Error::config("task length must be >= 1"));
                }
            }
            ArrivalPolicy::Uniform {
                min_tasks,
                max_tasks,
                min_length,
                max_length,
            } => {
                if min_tasks > max_tasks {
                    return Err(Error::config("min_tasks must be <= max_tasks"));
                }
                validate_lengths(*min_length, *max_length)?;
            }
            ArrivalPolicy::Bursty {
                arrival_probability,
                burst_probability,
                min_length,
                max_length,
                ..
            } => {
                for (name, p) in [
                    ("arrival_probability", arrival_probability),
                    ("burst_probability", burst_probability),
                ] {
                    if !(0.0..=1.0).contains(p) {
                        return Err(Error::config(format!("{} must be within [0, 1]", name)));
                    }
                }
                validate_lengths(*min_length, *max_length)?;
            }
            ArrivalPolicy::Trace { arrivals } => {
                for a in arrivals {
                    if a.tick >= end_tick {
                        return Err(Error::config(format!(
                            "trace arrival at tick {} is past the tick budget of {}",
                            a.tick, end_tick
                        )));
                    }
                    if a.length == 0 {
                        return Err(Error::config(format!(
                            "trace arrival at tick {} has zero length",
                            a.tick
                        )));
                    }
                    if let Some(p) = a.processor {
                        if p >= processor_count {
                            return Err(Error::config(format!(
                                "trace arrival targets processor {} but only {} exist",
                                p, processor_count
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_lengths(min: u64, max: u64) -> Result<()> {
    if min == 0 {
        return Err(Error::config("min_length must be >= 1"));
    }
    if min > max {
        return Err(Error::config("min_length must be <= max_length"));
    }
    Ok(())
}

/// A freshly generated task and the processor it arrived at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub task: Task,
    pub origin: ProcessorId,
}

#[derive(Debug)]
pub struct TaskGenerator {
    policy: ArrivalPolicy,
    rng: Pcg64,
    processor_count: usize,
    end_tick: Tick,
    max_tasks: Option<u64>,
    next_id: u64,
    // trace entries sorted by tick, consumed from `trace_pos`
    trace_pos: usize,
}

impl TaskGenerator {
    pub fn new(
        policy: ArrivalPolicy,
        rng: Pcg64,
        processor_count: usize,
        end_tick: Tick,
        max_tasks: Option<u64>,
    ) -> Self {
        let policy = match policy {
            ArrivalPolicy::Trace { mut arrivals } => {
                // stable: same-tick entries keep their listed order
                arrivals.sort_by_key(|a| a.tick);
                ArrivalPolicy::Trace { arrivals }
            }
            other => other,
        };

        Self {
            policy,
            rng,
            processor_count: processor_count.max(1),
            end_tick,
            max_tasks,
            next_id: 0,
            trace_pos: 0,
        }
    }

    pub fn with_seed(
        policy: ArrivalPolicy,
        seed: u64,
        processor_count: usize,
        end_tick: Tick,
        max_tasks: Option<u64>,
    ) -> Self {
        Self::new(
            policy,
            Pcg64::seed_from_u64(seed),
            processor_count,
            end_tick,
            max_tasks,
        )
    }

    /// Arrivals for tick `now`. Never blocks; empty once exhausted.
    pub fn generate(&mut self, now: Tick) -> Vec<Arrival> {
        if self.is_exhausted(now) {
            return Vec::new();
        }

        let specs: Vec<(u64, Option<usize>)> = match &self.policy {
            ArrivalPolicy::Fixed { per_tick, length } => {
                (0..*per_tick).map(|_| (*length, None)).collect()
            }
            ArrivalPolicy::Uniform {
                min_tasks,
                max_tasks,
                min_length,
                max_length,
            } => {
                let (min_len, max_len) = (*min_length, *max_length);
                let count = self.rng.gen_range(*min_tasks..=*max_tasks);
                (0..count)
                    .map(|_| (self.rng.gen_range(min_len..=max_len), None))
                    .collect()
            }
            ArrivalPolicy::Bursty {
                arrival_probability,
                burst_probability,
                burst_size,
                min_length,
                max_length,
            } => {
                let (min_len, max_len) = (*min_length, *max_length);
                let count = if self.rng.gen_bool(*burst_probability) {
                    *burst_size
                } else if self.rng.gen_bool(*arrival_probability) {
                    1
                } else {
                    0
                };
                (0..count)
                    .map(|_| (self.rng.gen_range(min_len..=max_len), None))
                    .collect()
            }
            ArrivalPolicy::Trace { arrivals } => {
                let mut out = Vec::new();
                while let Some(a) = arrivals.get(self.trace_pos) {
                    if a.tick > now {
                        break;
                    }
                    // entries before the current tick can only be skipped ones
                    if a.tick == now {
                        out.push((a.length, Some(a.processor.unwrap_or(0))));
                    }
                    self.trace_pos += 1;
                }
                out
            }
        };

        let mut arrivals = Vec::with_capacity(specs.len());
        for (length, origin) in specs {
            if self.limit_reached() {
                break;
            }
            let origin = match origin {
                Some(p) => p,
                None => self.rng.gen_range(0..self.processor_count),
            };
            let task = Task::new(TaskId(self.next_id), now, length);
            self.next_id += 1;
            arrivals.push(Arrival {
                task,
                origin: ProcessorId(origin),
            });
        }
        arrivals
    }

    fn limit_reached(&self) -> bool {
        self.max_tasks.map_or(false, |max| self.next_id >= max)
    }

    /// No arrivals will be produced at `now` or later.
    pub fn is_exhausted(&self, now: Tick) -> bool {
        if now >= self.end_tick || self.limit_reached() {
            return true;
        }
        match &self.policy {
            ArrivalPolicy::Trace { arrivals } => self.trace_pos >= arrivals.len(),
            _ => false,
        }
    }

    /// Tasks produced so far.
    pub fn generated(&self) -> u64 {
        self.next_id
    }
}
