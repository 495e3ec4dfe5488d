//! Sharding rules
//!
//! A [`ShardingRuleSet`] is built once from configuration and never mutated
//! afterwards. It holds:
//!
//! - one [`ShardingRule`] per sharded logical table, with its expanded
//!   actual data nodes and optional database/table strategies
//! - [`BindingTableRule`] groups whose members shard identically
//! - the broadcast tables, present on every datasource
//! - optional defaults: datasource for unmanaged tables, and strategies for
//!   rules that declare none

use crate::error::{ConfigurationError, Result};
use crate::node::DataNode;
use crate::strategy::ShardingStrategy;
use crate::targets;
use std::collections::HashMap;

static NO_STRATEGY: ShardingStrategy = ShardingStrategy::None;

/// Routing configuration of one logical table
#[derive(Debug, Clone)]
pub struct ShardingRule {
    logic_table: String,
    actual_data_nodes: Vec<DataNode>,
    database_strategy: Option<ShardingStrategy>,
    table_strategy: Option<ShardingStrategy>,
}

impl ShardingRule {
    /// Create a rule over an explicit, non-empty node list
    pub fn new(logic_table: impl Into<String>, actual_data_nodes: Vec<DataNode>) -> Result<Self> {
        let logic_table: String = logic_table.into();
        let logic_table = logic_table.trim().to_string();
        if actual_data_nodes.is_empty() {
            return Err(ConfigurationError::EmptyDataNodes(logic_table));
        }
        Ok(Self {
            logic_table,
            actual_data_nodes,
            database_strategy: None,
            table_strategy: None,
        })
    }

    /// Create a rule from node notation such as `ds${0..1}.t_order_${0..1}`
    pub fn from_expression(logic_table: impl Into<String>, expression: &str) -> Result<Self> {
        Self::new(logic_table, DataNode::expand(expression)?)
    }

    pub fn with_database_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    pub fn with_table_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.table_strategy = Some(strategy);
        self
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn actual_data_nodes(&self) -> &[DataNode] {
        &self.actual_data_nodes
    }

    pub fn database_strategy(&self) -> Option<&ShardingStrategy> {
        self.database_strategy.as_ref()
    }

    pub fn table_strategy(&self) -> Option<&ShardingStrategy> {
        self.table_strategy.as_ref()
    }

    /// Distinct datasources holding this table, ascending
    pub fn data_source_names(&self) -> Vec<String> {
        targets::normalize(self.actual_data_nodes.iter().map(|n| n.data_source.clone()))
    }

    /// Actual tables of this rule on one datasource, ascending
    pub fn actual_tables(&self, data_source: &str) -> Vec<String> {
        targets::normalize(
            self.actual_data_nodes
                .iter()
                .filter(|n| n.data_source.eq_ignore_ascii_case(data_source))
                .map(|n| n.table.clone()),
        )
    }

    /// Position of a node in the expanded list
    pub fn position_of(&self, data_source: &str, table: &str) -> Option<usize> {
        self.actual_data_nodes.iter().position(|n| {
            n.data_source.eq_ignore_ascii_case(data_source) && n.table.eq_ignore_ascii_case(table)
        })
    }
}

/// Logical tables that must resolve to the same node positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTableRule {
    tables: Vec<String>,
}

impl BindingTableRule {
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains(&self, logic_table: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(logic_table))
    }

    /// Member whose resolution the rest of the group follows.
    ///
    /// The first referenced member, in declaration order, for which
    /// `has_input` holds; otherwise the first referenced member.
    pub fn driver_among<'a, F>(&'a self, referenced: &[String], has_input: F) -> Option<&'a str>
    where
        F: Fn(&str) -> bool,
    {
        let mut members = self
            .tables
            .iter()
            .filter(|t| referenced.iter().any(|r| r.eq_ignore_ascii_case(t)));
        let first = members.next()?;
        if has_input(first) {
            return Some(first);
        }
        Some(members.find(|t| has_input(t.as_str())).unwrap_or(first).as_str())
    }
}

/// How the engine treats a referenced logical table
#[derive(Debug, Clone, Copy)]
pub enum TableKind<'a> {
    Broadcast,
    Sharded(&'a ShardingRule),
    Unmanaged,
}

/// Immutable collection of every sharding rule in a snapshot
#[derive(Debug, Clone)]
pub struct ShardingRuleSet {
    rules: HashMap<String, ShardingRule>,
    binding_rules: Vec<BindingTableRule>,
    broadcast_tables: Vec<String>,
    data_source_names: Vec<String>,
    default_data_source: Option<String>,
    default_database_strategy: Option<ShardingStrategy>,
    default_table_strategy: Option<ShardingStrategy>,
}

impl ShardingRuleSet {
    pub fn builder() -> ShardingRuleSetBuilder {
        ShardingRuleSetBuilder::default()
    }

    pub fn rule(&self, logic_table: &str) -> Option<&ShardingRule> {
        self.rules.get(&logic_table.to_ascii_lowercase())
    }

    /// Sharded logical tables, ascending
    pub fn logic_tables(&self) -> Vec<String> {
        targets::normalize(self.rules.values().map(|r| r.logic_table.clone()))
    }

    pub fn is_broadcast(&self, logic_table: &str) -> bool {
        self.broadcast_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(logic_table))
    }

    pub fn broadcast_tables(&self) -> &[String] {
        &self.broadcast_tables
    }

    pub fn classify(&self, logic_table: &str) -> TableKind<'_> {
        if self.is_broadcast(logic_table) {
            TableKind::Broadcast
        } else if let Some(rule) = self.rule(logic_table) {
            TableKind::Sharded(rule)
        } else {
            TableKind::Unmanaged
        }
    }

    pub fn binding_rules(&self) -> &[BindingTableRule] {
        &self.binding_rules
    }

    /// Binding group containing `logic_table`, if any
    pub fn binding_rule(&self, logic_table: &str) -> Option<&BindingTableRule> {
        self.binding_rules.iter().find(|b| b.contains(logic_table))
    }

    /// Every known datasource, ascending
    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source.as_deref()
    }

    /// The rule's own database strategy, else the default, else none
    pub fn database_strategy_for<'a>(&'a self, rule: &'a ShardingRule) -> &'a ShardingStrategy {
        rule.database_strategy
            .as_ref()
            .or(self.default_database_strategy.as_ref())
            .unwrap_or(&NO_STRATEGY)
    }

    /// The rule's own table strategy, else the default, else none
    pub fn table_strategy_for<'a>(&'a self, rule: &'a ShardingRule) -> &'a ShardingStrategy {
        rule.table_strategy
            .as_ref()
            .or(self.default_table_strategy.as_ref())
            .unwrap_or(&NO_STRATEGY)
    }
}

/// Collects rules and validates them as a whole
#[derive(Debug, Default)]
pub struct ShardingRuleSetBuilder {
    rules: Vec<ShardingRule>,
    binding_groups: Vec<Vec<String>>,
    broadcast_tables: Vec<String>,
    data_sources: Vec<String>,
    default_data_source: Option<String>,
    default_database_strategy: Option<ShardingStrategy>,
    default_table_strategy: Option<ShardingStrategy>,
}

impl ShardingRuleSetBuilder {
    pub fn rule(mut self, rule: ShardingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn binding_group<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binding_groups
            .push(tables.into_iter().map(|t| t.into().trim().to_string()).collect());
        self
    }

    pub fn broadcast_table(mut self, logic_table: impl Into<String>) -> Self {
        self.broadcast_tables.push(logic_table.into().trim().to_string());
        self
    }

    /// Declare a datasource that may hold no sharded node (broadcast, default)
    pub fn data_source(mut self, name: impl Into<String>) -> Self {
        self.data_sources.push(name.into().trim().to_string());
        self
    }

    pub fn default_data_source(mut self, name: impl Into<String>) -> Self {
        self.default_data_source = Some(name.into().trim().to_string());
        self
    }

    pub fn default_database_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.default_database_strategy = Some(strategy);
        self
    }

    pub fn default_table_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.default_table_strategy = Some(strategy);
        self
    }

    /// Validate and freeze the rule set
    pub fn build(self) -> Result<ShardingRuleSet> {
        let mut rules: HashMap<String, ShardingRule> = HashMap::new();
        for rule in self.rules {
            let key = rule.logic_table.to_ascii_lowercase();
            if rules.contains_key(&key) {
                return Err(ConfigurationError::DuplicateTable(rule.logic_table));
            }
            rules.insert(key, rule);
        }

        let broadcast_tables = targets::normalize(self.broadcast_tables);
        if let Some(both) = broadcast_tables
            .iter()
            .find(|t| rules.contains_key(&t.to_ascii_lowercase()))
        {
            return Err(ConfigurationError::DuplicateTable(both.clone()));
        }

        let mut binding_rules: Vec<BindingTableRule> = Vec::new();
        for group in self.binding_groups {
            let binding = Self::validate_binding(&rules, group)?;
            if let Some(shared) = binding.tables.iter().find(|t| {
                binding_rules.iter().any(|existing| existing.contains(t))
            }) {
                return Err(ConfigurationError::binding_mismatch(
                    &binding.tables,
                    format!("table '{}' already belongs to another binding group", shared),
                ));
            }
            binding_rules.push(binding);
        }

        let data_source_names = targets::normalize(
            self.data_sources
                .into_iter()
                .chain(self.default_data_source.clone())
                .chain(rules.values().flat_map(|r| r.data_source_names())),
        );
        if data_source_names.is_empty() {
            return Err(ConfigurationError::NoDataSource);
        }

        Ok(ShardingRuleSet {
            rules,
            binding_rules,
            broadcast_tables,
            data_source_names,
            default_data_source: self.default_data_source,
            default_database_strategy: self.default_database_strategy,
            default_table_strategy: self.default_table_strategy,
        })
    }

    /// Members must exist and expand to node lists of equal length whose
    /// datasources and table indexes line up position by position.
    fn validate_binding(
        rules: &HashMap<String, ShardingRule>,
        tables: Vec<String>,
    ) -> Result<BindingTableRule> {
        if tables.is_empty() || tables.iter().any(String::is_empty) {
            return Err(ConfigurationError::binding_mismatch(&tables, "empty table name"));
        }

        let mut members: Vec<&ShardingRule> = Vec::with_capacity(tables.len());
        for table in &tables {
            let rule = rules
                .get(&table.to_ascii_lowercase())
                .ok_or_else(|| ConfigurationError::UnknownBindingTable(table.clone()))?;
            if members.iter().any(|m| m.logic_table.eq_ignore_ascii_case(table)) {
                return Err(ConfigurationError::binding_mismatch(
                    &tables,
                    format!("table '{}' listed twice", table),
                ));
            }
            members.push(rule);
        }

        let driver = members[0];
        for member in &members[1..] {
            if member.actual_data_nodes.len() != driver.actual_data_nodes.len() {
                return Err(ConfigurationError::binding_mismatch(
                    &tables,
                    format!(
                        "'{}' has {} nodes but '{}' has {}",
                        driver.logic_table,
                        driver.actual_data_nodes.len(),
                        member.logic_table,
                        member.actual_data_nodes.len()
                    ),
                ));
            }
            let misaligned = driver
                .actual_data_nodes
                .iter()
                .zip(&member.actual_data_nodes)
                .position(|(a, b)| !a.data_source.eq_ignore_ascii_case(&b.data_source));
            if let Some(position) = misaligned {
                return Err(ConfigurationError::binding_mismatch(
                    &tables,
                    format!(
                        "node {} of '{}' is on '{}' but node {} of '{}' is on '{}'",
                        position,
                        driver.logic_table,
                        driver.actual_data_nodes[position].data_source,
                        position,
                        member.logic_table,
                        member.actual_data_nodes[position].data_source
                    ),
                ));
            }
            let reordered = driver
                .actual_data_nodes
                .iter()
                .zip(&member.actual_data_nodes)
                .position(|(a, b)| {
                    matches!(
                        (targets::suffix_index(&a.table), targets::suffix_index(&b.table)),
                        (Some(x), Some(y)) if x != y
                    )
                });
            if let Some(position) = reordered {
                return Err(ConfigurationError::binding_mismatch(
                    &tables,
                    format!(
                        "node {} is '{}' for '{}' but '{}' for '{}'",
                        position,
                        driver.actual_data_nodes[position],
                        driver.logic_table,
                        member.actual_data_nodes[position],
                        member.logic_table
                    ),
                ));
            }
        }

        Ok(BindingTableRule { tables })
    }
}
