/*!
 * Immutable rule snapshots and their atomic publication
 *
 * A snapshot is built whole from a `RoutingConfig` or not at all. Routing
 * calls take an `Arc` to the current snapshot and keep it for the whole
 * statement, so a concurrent reload is observed either fully or not at all.
 */

use crate::config::{RoutingConfig, StrategyConfig};
use crate::error::Result;
use parking_lot::RwLock;
use shardgate_core_replica::{LoadBalanceKind, MasterSlaveRule, MasterSlaveRuleSet};
use shardgate_core_sharding::{
    AlgorithmRegistry, ComplexStrategy, HintStrategy, InlineStrategy, ShardingRule,
    ShardingRuleSet, ShardingStrategy, StandardStrategy,
};
use std::sync::Arc;
use tracing::info;

/// Every rule needed to route one statement
#[derive(Debug)]
pub struct RuleSnapshot {
    sharding: ShardingRuleSet,
    master_slave: MasterSlaveRuleSet,
}

impl RuleSnapshot {
    pub fn new(sharding: ShardingRuleSet, master_slave: MasterSlaveRuleSet) -> Self {
        Self {
            sharding,
            master_slave,
        }
    }

    /// Validate `config` and build every rule, resolving algorithm names
    /// against `registry`
    pub fn build(config: &RoutingConfig, registry: &AlgorithmRegistry) -> Result<Self> {
        let mut builder = ShardingRuleSet::builder();
        for data_source in &config.data_sources {
            builder = builder.data_source(data_source.as_str());
        }
        // logical master/slave names are datasources the sharding layer may pick
        for master_slave in &config.master_slave {
            builder = builder.data_source(master_slave.name.as_str());
        }
        if let Some(default) = &config.default_data_source {
            builder = builder.default_data_source(default.as_str());
        }
        for table in &config.broadcast_tables {
            builder = builder.broadcast_table(table.as_str());
        }
        if let Some(strategy) = &config.default_database_strategy {
            builder = builder.default_database_strategy(build_strategy(strategy, registry)?);
        }
        if let Some(strategy) = &config.default_table_strategy {
            builder = builder.default_table_strategy(build_strategy(strategy, registry)?);
        }
        for table in &config.tables {
            let mut rule =
                ShardingRule::from_expression(table.logic_table.as_str(), &table.actual_data_nodes)?;
            if let Some(strategy) = &table.database_strategy {
                rule = rule.with_database_strategy(build_strategy(strategy, registry)?);
            }
            if let Some(strategy) = &table.table_strategy {
                rule = rule.with_table_strategy(build_strategy(strategy, registry)?);
            }
            builder = builder.rule(rule);
        }
        for group in &config.binding_tables {
            builder = builder.binding_group(group.iter().map(String::as_str));
        }
        let sharding = builder.build()?;

        let mut master_slave_rules = Vec::with_capacity(config.master_slave.len());
        for entry in &config.master_slave {
            let load_balance = match &entry.load_balance {
                Some(tag) => tag.parse::<LoadBalanceKind>()?,
                None => LoadBalanceKind::default(),
            };
            master_slave_rules.push(MasterSlaveRule::new(
                entry.name.as_str(),
                entry.master.as_str(),
                entry.slaves.iter().map(String::as_str),
                load_balance,
            )?);
        }
        let master_slave = MasterSlaveRuleSet::new(master_slave_rules)?;

        Ok(Self::new(sharding, master_slave))
    }

    pub fn sharding(&self) -> &ShardingRuleSet {
        &self.sharding
    }

    pub fn master_slave(&self) -> &MasterSlaveRuleSet {
        &self.master_slave
    }
}

fn build_strategy(
    config: &StrategyConfig,
    registry: &AlgorithmRegistry,
) -> shardgate_core_sharding::Result<ShardingStrategy> {
    Ok(match config {
        StrategyConfig::None => ShardingStrategy::None,
        StrategyConfig::Standard {
            column,
            precise,
            range,
        } => {
            let range = match range {
                Some(name) => Some(registry.range(name)?),
                None => None,
            };
            ShardingStrategy::Standard(StandardStrategy::new(
                column.as_str(),
                registry.precise(precise)?,
                range,
            )?)
        }
        StrategyConfig::Complex { columns, algorithm } => ShardingStrategy::Complex(
            ComplexStrategy::new(columns.iter().map(String::as_str), registry.complex(algorithm)?)?,
        ),
        StrategyConfig::Hint { algorithm } => {
            ShardingStrategy::Hint(HintStrategy::new(registry.hint(algorithm)?))
        }
        StrategyConfig::Inline { column, expression } => {
            ShardingStrategy::Inline(InlineStrategy::new(column.as_str(), expression)?)
        }
    })
}

/// Current snapshot plus the version it was published under
#[derive(Debug)]
struct Published {
    version: u64,
    snapshot: Arc<RuleSnapshot>,
}

/// Publishes snapshots by swapping an `Arc`.
///
/// The lock is held only for the pointer copy or swap, never while routing.
#[derive(Debug)]
pub struct SnapshotHolder {
    current: RwLock<Published>,
}

impl SnapshotHolder {
    /// Holder whose first snapshot is version 1
    pub fn new(snapshot: RuleSnapshot) -> Self {
        Self {
            current: RwLock::new(Published {
                version: 1,
                snapshot: Arc::new(snapshot),
            }),
        }
    }

    /// Current snapshot; stays valid after later reloads
    pub fn load(&self) -> Arc<RuleSnapshot> {
        Arc::clone(&self.current.read().snapshot)
    }

    /// Current snapshot together with its version
    pub fn load_versioned(&self) -> (u64, Arc<RuleSnapshot>) {
        let current = self.current.read();
        (current.version, Arc::clone(&current.snapshot))
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Replace the current snapshot, returning the new version
    pub fn publish(&self, snapshot: RuleSnapshot) -> u64 {
        let snapshot = Arc::new(snapshot);
        let version = {
            let mut current = self.current.write();
            current.version += 1;
            current.snapshot = snapshot;
            current.version
        };
        info!(version, "Published rule snapshot");
        version
    }
}
