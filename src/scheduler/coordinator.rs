//! Strategy dispatch - picks the balancer named by the configuration

use super::centralized::{CentralizedBalancer, CentralizedConfig};
use super::work_stealing::WorkStealingBalancer;
use super::{Balancer, Migration};
use crate::config::{BalancingStrategy, Config};
use crate::executor::{Processor, Tick};

/// The active balancer, one variant per strategy
#[derive(Debug, Clone)]
pub enum BalancerKind {
    Centralized(CentralizedBalancer),
    WorkStealing(WorkStealingBalancer),
}

impl BalancerKind {
    pub fn from_config(config: &Config) -> Self {
        match config.strategy {
            BalancingStrategy::Centralized => {
                BalancerKind::Centralized(CentralizedBalancer::new(CentralizedConfig::from(config)))
            }
            BalancingStrategy::WorkStealing => BalancerKind::WorkStealing(WorkStealingBalancer::new()),
        }
    }

    pub fn strategy(&self) -> BalancingStrategy {
        match self {
            BalancerKind::Centralized(_) => BalancingStrategy::Centralized,
            BalancerKind::WorkStealing(_) => BalancingStrategy::WorkStealing,
        }
    }
}

impl Balancer for BalancerKind {
    fn rebalance(&mut self, processors: &mut [Processor], now: Tick) -> Vec<Migration> {
        match self {
            BalancerKind::Centralized(b) => b.rebalance(processors, now),
            BalancerKind::WorkStealing(b) => b.rebalance(processors, now),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BalancerKind::Centralized(b) => b.name(),
            BalancerKind::WorkStealing(b) => b.name(),
        }
    }
}
