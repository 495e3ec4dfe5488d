//! Slave selection for reads outside a dirty transaction

use crate::error::ReplicaError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Load-balance policy tag as written in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceKind {
    #[default]
    RoundRobin,
    Random,
}

impl LoadBalanceKind {
    /// Fresh algorithm instance; each rule owns its own
    pub fn algorithm(self) -> Box<dyn LoadBalanceAlgorithm> {
        match self {
            LoadBalanceKind::RoundRobin => Box::new(RoundRobinLoadBalance::default()),
            LoadBalanceKind::Random => Box::new(RandomLoadBalance),
        }
    }
}

impl fmt::Display for LoadBalanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBalanceKind::RoundRobin => write!(f, "round_robin"),
            LoadBalanceKind::Random => write!(f, "random"),
        }
    }
}

impl FromStr for LoadBalanceKind {
    type Err = ReplicaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(LoadBalanceKind::RoundRobin),
            "random" => Ok(LoadBalanceKind::Random),
            _ => Err(ReplicaError::InvalidLoadBalance(s.to_string())),
        }
    }
}

/// Chooses one slave; `None` only when there are no slaves
pub trait LoadBalanceAlgorithm: fmt::Debug + Send + Sync {
    fn kind(&self) -> LoadBalanceKind;

    fn pick<'a>(&self, slaves: &'a [String]) -> Option<&'a str>;
}

/// Cycles through slaves in declaration order
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalance {
    next: AtomicUsize,
}

impl LoadBalanceAlgorithm for RoundRobinLoadBalance {
    fn kind(&self) -> LoadBalanceKind {
        LoadBalanceKind::RoundRobin
    }

    fn pick<'a>(&self, slaves: &'a [String]) -> Option<&'a str> {
        if slaves.is_empty() {
            return None;
        }
        let turn = self.next.fetch_add(1, Ordering::Relaxed);
        slaves.get(turn % slaves.len()).map(String::as_str)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomLoadBalance;

impl LoadBalanceAlgorithm for RandomLoadBalance {
    fn kind(&self) -> LoadBalanceKind {
        LoadBalanceKind::Random
    }

    fn pick<'a>(&self, slaves: &'a [String]) -> Option<&'a str> {
        if slaves.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..slaves.len());
        slaves.get(index).map(String::as_str)
    }
}
