use crate::error::{Error, Result};
use crate::executor::Tick;
use crate::workload::ArrivalPolicy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalancingStrategy {
    #[serde(rename = "centralized")]
    Centralized,
    #[serde(rename = "work-stealing")]
    WorkStealing,
}

impl Default for BalancingStrategy {
    fn default() -> Self {
        BalancingStrategy::WorkStealing
    }
}

impl BalancingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalancingStrategy::Centralized => "centralized",
            BalancingStrategy::WorkStealing => "work-stealing",
        }
    }
}

impl std::fmt::Display for BalancingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalancingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "centralized" => Ok(BalancingStrategy::Centralized),
            "work-stealing" | "work_stealing" => Ok(BalancingStrategy::WorkStealing),
            other => Err(Error::config(format!(
                "unknown balancing strategy '{}' (expected 'centralized' or 'work-stealing')",
                other
            ))),
        }
    }
}

/// Where a newly arrived task is first queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentPolicy {
    /// Lowest load at arrival time, lowest id on ties.
    ShortestQueue,
    /// Cycle over online processors.
    RoundRobin,
    /// The processor the generator says the task arrived at.
    Origin,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        AssignmentPolicy::ShortestQueue
    }
}

impl FromStr for AssignmentPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortest-queue" | "least-loaded" => Ok(AssignmentPolicy::ShortestQueue),
            "round-robin" => Ok(AssignmentPolicy::RoundRobin),
            "origin" => Ok(AssignmentPolicy::Origin),
            other => Err(Error::config(format!("unknown assignment policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Fail,
    Recover,
}

/// Take a processor offline, or bring it back, at the start of `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultEvent {
    pub tick: Tick,
    pub processor: usize,
    pub kind: FaultKind,
}

impl FaultEvent {
    pub fn fail(tick: Tick, processor: usize) -> Self {
        Self {
            tick,
            processor,
            kind: FaultKind::Fail,
        }
    }

    pub fn recover(tick: Tick, processor: usize) -> Self {
        Self {
            tick,
            processor,
            kind: FaultKind::Recover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub processor_count: usize,
    pub strategy: BalancingStrategy,
    pub arrival: ArrivalPolicy,
    pub assignment: AssignmentPolicy,

    /// Ticks during which tasks may arrive.
    pub tick_budget: Tick,
    pub max_tasks: Option<u64>,
    /// Extra ticks allowed after the budget to finish outstanding work.
    pub max_drain_ticks: Tick,

    // centralized only
    pub rebalance_interval: u64,
    pub imbalance_threshold: usize,

    pub seed: u64,
    pub faults: Vec<FaultEvent>,
    pub record_trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processor_count: 4,
            strategy: BalancingStrategy::default(),
            arrival: ArrivalPolicy::default(),
            assignment: AssignmentPolicy::default(),
            tick_budget: 1_000,
            max_tasks: None,
            max_drain_ticks: 0,
            rebalance_interval: 5,
            imbalance_threshold: 1,
            seed: 42,
            faults: Vec::new(),
            record_trace: false,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.processor_count == 0 {
            return Err(Error::config("processor_count must be > 0"));
        }
        if self.processor_count > 4096 {
            return Err(Error::config("processor_count too large (max 4096)"));
        }

        if self.rebalance_interval == 0 {
            return Err(Error::config("rebalance_interval must be > 0"));
        }

        self.arrival.validate(self.processor_count, self.tick_budget)?;

        for fault in &self.faults {
            if fault.processor >= self.processor_count {
                return Err(Error::config(format!(
                    "fault at tick {} targets processor {} but only {} exist",
                    fault.tick, fault.processor, self.processor_count
                )));
            }
        }

        Ok(())
    }

    /// Load a configuration from a JSON file. The result is validated.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn processor_count(mut self, n: usize) -> Self {
        self.config.processor_count = n;
        self
    }

    pub fn strategy(mut self, strategy: BalancingStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn arrival(mut self, arrival: ArrivalPolicy) -> Self {
        self.config.arrival = arrival;
        self
    }

    pub fn assignment(mut self, assignment: AssignmentPolicy) -> Self {
        self.config.assignment = assignment;
        self
    }

    pub fn tick_budget(mut self, ticks: Tick) -> Self {
        self.config.tick_budget = ticks;
        self
    }

    pub fn max_tasks(mut self, n: u64) -> Self {
        self.config.max_tasks = Some(n);
        self
    }

    pub fn max_drain_ticks(mut self, ticks: Tick) -> Self {
        self.config.max_drain_ticks = ticks;
        self
    }

    pub fn rebalance_interval(mut self, ticks: u64) -> Self {
        self.config.rebalance_interval = ticks;
        self
    }

    pub fn imbalance_threshold(mut self, threshold: usize) -> Self {
        self.config.imbalance_threshold = threshold;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn fault(mut self, fault: FaultEvent) -> Self {
        self.config.faults.push(fault);
        self
    }

    pub fn record_trace(mut self, record: bool) -> Self {
        self.config.record_trace = record;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_processors_rejected() {
        let err = Config::builder().processor_count(0).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Config::builder().rebalance_interval(0).build().is_err());
    }

    #[test]
    fn test_fault_out_of_range_rejected() {
        let result = Config::builder()
            .processor_count(2)
            .fault(FaultEvent::fail(3, 2))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_trace_beyond_budget_rejected() {
        let result = Config::builder()
            .tick_budget(5)
            .arrival(ArrivalPolicy::trace(vec![
                crate::workload::TraceArrival::new(0, 1),
                crate::workload::TraceArrival::new(5, 1),
            ]))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "centralized".parse::<BalancingStrategy>().unwrap(),
            BalancingStrategy::Centralized
        );
        assert_eq!(
            "Work-Stealing".parse::<BalancingStrategy>().unwrap(),
            BalancingStrategy::WorkStealing
        );
        assert!("round-robin".parse::<BalancingStrategy>().is_err());
        assert_eq!(BalancingStrategy::WorkStealing.to_string(), "work-stealing");
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let json = r#"{ "processor_count": 3, "strategy": "centralized", "seed": 7 }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.processor_count, 3);
        assert_eq!(config.strategy, BalancingStrategy::Centralized);
        assert_eq!(config.rebalance_interval, 5);
        assert!(config.validate().is_ok());
    }
}
