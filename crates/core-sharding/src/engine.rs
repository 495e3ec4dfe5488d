//! Statement routing across every table a statement references
//!
//! For each referenced logical table the engine decides:
//!
//! - **broadcast**: one unit per known datasource, actual table = logical name
//! - **sharded**: database strategy over the rule's datasources, then table
//!   strategy within each shortlisted datasource; only real actual data
//!   nodes become units
//! - **bound**: members of a binding group reuse the node positions of the
//!   group's driving table instead of evaluating their own strategies
//! - **unmanaged**: the default datasource if one is configured, otherwise
//!   the statement is rejected before anything is routed

use crate::error::{ConfigurationError, Result};
use crate::hint::HintContext;
use crate::result::{RoutingResult, RoutingResultBuilder};
use crate::rule::{ShardingRule, ShardingRuleSet, TableKind};
use crate::value::{Literal, ShardingValue};
use std::collections::HashMap;
use tracing::debug;

/// Everything the SQL extraction layer learned about one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingContext {
    tables: Vec<String>,
    values: Vec<ShardingValue>,
}

impl ShardingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference a logical table; repeated names are ignored
    pub fn with_table(mut self, logic_table: impl Into<String>) -> Self {
        self.add_table(logic_table.into());
        self
    }

    /// Attach an extracted value; its table becomes referenced too
    pub fn with_value(mut self, value: ShardingValue) -> Self {
        self.add_table(value.logic_table.clone());
        self.values.push(value);
        self
    }

    fn add_table(&mut self, logic_table: String) {
        let logic_table = logic_table.trim().to_string();
        if !self
            .tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&logic_table))
        {
            self.tables.push(logic_table);
        }
    }

    /// Referenced tables in first-mention order
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn values(&self) -> &[ShardingValue] {
        &self.values
    }

    pub fn values_for(&self, logic_table: &str) -> Vec<&ShardingValue> {
        self.values.iter().filter(|v| v.is_table(logic_table)).collect()
    }
}

/// Node positions chosen for one sharded table
#[derive(Debug, Clone)]
struct Resolution {
    positions: Vec<usize>,
    full_route: bool,
}

/// Routes statements against one immutable rule set
#[derive(Debug, Clone, Copy)]
pub struct RoutingEngine<'a> {
    rules: &'a ShardingRuleSet,
}

impl<'a> RoutingEngine<'a> {
    pub fn new(rules: &'a ShardingRuleSet) -> Self {
        Self { rules }
    }

    /// Route one statement.
    ///
    /// Fails only with [`ConfigurationError::UnmanagedTable`] when a table
    /// has no rule, is not broadcast and no default datasource exists.
    pub fn route(
        &self,
        context: &ShardingContext,
        hint: Option<&HintContext>,
    ) -> Result<RoutingResult> {
        let default_data_source = self.rules.default_data_source();
        let kinds: Vec<(&str, TableKind<'_>)> = context
            .tables()
            .iter()
            .map(|t| (t.as_str(), self.rules.classify(t)))
            .collect();

        if default_data_source.is_none() {
            if let Some((table, _)) = kinds
                .iter()
                .find(|(_, kind)| matches!(kind, TableKind::Unmanaged))
            {
                return Err(ConfigurationError::UnmanagedTable(table.to_string()));
            }
        }

        let mut builder = RoutingResultBuilder::default();
        if kinds.is_empty() {
            let target = default_data_source
                .or_else(|| self.rules.data_source_names().first().map(String::as_str))
                .ok_or(ConfigurationError::NoDataSource)?;
            debug!(data_source = target, "Statement references no table, unicasting");
            builder.add_data_source(target);
            return Ok(builder.build());
        }

        let mut resolved: HashMap<String, Resolution> = HashMap::new();
        for (table, kind) in &kinds {
            match kind {
                TableKind::Broadcast => {
                    for data_source in self.rules.data_source_names() {
                        builder.add(data_source, table, table);
                    }
                }
                TableKind::Unmanaged => {
                    if let Some(data_source) = default_data_source {
                        debug!(table, data_source, "Unmanaged table routed to default datasource");
                        builder.add(data_source, table, table);
                    }
                }
                TableKind::Sharded(rule) => {
                    let resolution = self.resolve_bound(rule, context, hint, &mut resolved);
                    if resolution.full_route {
                        builder.mark_full_route();
                    }
                    for position in &resolution.positions {
                        if let Some(node) = rule.actual_data_nodes().get(*position) {
                            builder.add(&node.data_source, rule.logic_table(), &node.table);
                        }
                    }
                }
            }
        }

        Ok(builder.build())
    }

    /// Resolve a sharded table, borrowing the driver's positions when the
    /// table is a non-driving member of a referenced binding group.
    fn resolve_bound(
        &self,
        rule: &ShardingRule,
        context: &ShardingContext,
        hint: Option<&HintContext>,
        resolved: &mut HashMap<String, Resolution>,
    ) -> Resolution {
        let driver = self
            .rules
            .binding_rule(rule.logic_table())
            .and_then(|binding| {
                binding.driver_among(context.tables(), |t| Self::has_routing_input(t, context, hint))
            })
            .and_then(|name| self.rules.rule(name));

        let source = match driver {
            Some(driver) if !driver.logic_table().eq_ignore_ascii_case(rule.logic_table()) => {
                debug!(
                    table = rule.logic_table(),
                    driver = driver.logic_table(),
                    "Binding table follows driving table"
                );
                driver
            }
            _ => rule,
        };

        let key = source.logic_table().to_ascii_lowercase();
        if let Some(resolution) = resolved.get(&key) {
            return resolution.clone();
        }
        let resolution = self.resolve(source, context, hint);
        resolved.insert(key, resolution.clone());
        resolution
    }

    /// Whether a table carries a usable value or a hint value
    fn has_routing_input(table: &str, context: &ShardingContext, hint: Option<&HintContext>) -> bool {
        context.values_for(table).iter().any(|v| v.is_usable())
            || hint.is_some_and(|h| {
                !h.database_values(table).is_empty() || !h.table_values(table).is_empty()
            })
    }

    /// Database strategy first, then table strategy per shortlisted datasource
    fn resolve(
        &self,
        rule: &ShardingRule,
        context: &ShardingContext,
        hint: Option<&HintContext>,
    ) -> Resolution {
        let table = rule.logic_table();
        let values = context.values_for(table);
        let database_hints: &[Literal] = hint.map(|h| h.database_values(table)).unwrap_or(&[]);
        let table_hints: &[Literal] = hint.map(|h| h.table_values(table)).unwrap_or(&[]);

        let database_decision = self.rules.database_strategy_for(rule).route(
            &rule.data_source_names(),
            &values,
            database_hints,
        );
        let table_strategy = self.rules.table_strategy_for(rule);

        let mut positions: Vec<usize> = Vec::new();
        let mut tables_full = true;
        for data_source in &database_decision.targets {
            let available = rule.actual_tables(data_source);
            let decision = table_strategy.route(&available, &values, table_hints);
            tables_full &= decision.full_route;
            positions.extend(
                decision
                    .targets
                    .iter()
                    .filter_map(|actual| rule.position_of(data_source, actual)),
            );
        }
        positions.sort_unstable();
        positions.dedup();

        let full_route = database_decision.full_route && tables_full;
        debug!(
            table,
            data_sources = ?database_decision.targets,
            nodes = positions.len(),
            full_route,
            "Resolved sharded table"
        );
        Resolution {
            positions,
            full_route,
        }
    }
}
