//! Master/slave rules, immutable once built

use crate::error::{ReplicaError, Result};
use crate::load_balance::{LoadBalanceAlgorithm, LoadBalanceKind};
use std::collections::HashMap;

/// One logical datasource backed by a master and its read replicas
#[derive(Debug)]
pub struct MasterSlaveRule {
    name: String,
    master: String,
    slaves: Vec<String>,
    load_balance: Box<dyn LoadBalanceAlgorithm>,
}

impl MasterSlaveRule {
    /// Fails with [`ReplicaError::NoMaster`] when `master` is blank
    pub fn new<I, S>(
        name: impl Into<String>,
        master: impl Into<String>,
        slaves: I,
        load_balance: LoadBalanceKind,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name: String = name.into();
        let master: String = master.into();
        let name = name.trim().to_string();
        let master = master.trim().to_string();
        if master.is_empty() {
            return Err(ReplicaError::NoMaster(name));
        }

        let mut declared: Vec<String> = Vec::new();
        for slave in slaves {
            let slave: String = slave.into();
            let slave = slave.trim();
            if !slave.is_empty() && !declared.iter().any(|s| s.eq_ignore_ascii_case(slave)) {
                declared.push(slave.to_string());
            }
        }

        Ok(Self {
            name,
            master,
            slaves: declared,
            load_balance: load_balance.algorithm(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn master(&self) -> &str {
        &self.master
    }

    pub fn slaves(&self) -> &[String] {
        &self.slaves
    }

    pub fn load_balance(&self) -> LoadBalanceKind {
        self.load_balance.kind()
    }

    /// Slave for the next read, or the master when none is configured
    pub fn read_target(&self) -> &str {
        self.load_balance.pick(&self.slaves).unwrap_or(self.master.as_str())
    }
}

/// Every master/slave rule of one snapshot, keyed by logical name
#[derive(Debug, Default)]
pub struct MasterSlaveRuleSet {
    rules: HashMap<String, MasterSlaveRule>,
}

impl MasterSlaveRuleSet {
    pub fn new(rules: Vec<MasterSlaveRule>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(rules.len());
        for rule in rules {
            let key = rule.name.to_ascii_lowercase();
            if by_name.contains_key(&key) {
                return Err(ReplicaError::DuplicateRule(rule.name));
            }
            by_name.insert(key, rule);
        }
        Ok(Self { rules: by_name })
    }

    pub fn rule(&self, logical: &str) -> Option<&MasterSlaveRule> {
        self.rules.get(&logical.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Logical datasource names, ascending
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.values().map(|r| r.name.clone()).collect();
        names.sort_by_key(|n| n.to_ascii_lowercase());
        names
    }
}
