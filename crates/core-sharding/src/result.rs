//! Routing results handed to the rewriting and execution layer

use crate::targets;
use serde::Serialize;
use std::collections::BTreeMap;

/// One logical table mapped to one actual table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableUnit {
    pub logic_table: String,
    pub actual_table: String,
}

/// Every actual table a statement touches on one datasource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingUnit {
    pub data_source: String,
    pub table_units: Vec<TableUnit>,
}

impl RoutingUnit {
    /// Distinct actual table names, ascending
    pub fn actual_tables(&self) -> Vec<String> {
        targets::normalize(self.table_units.iter().map(|u| u.actual_table.clone()))
    }

    /// Actual tables standing in for one logical table
    pub fn actual_tables_of(&self, logic_table: &str) -> Vec<String> {
        targets::normalize(
            self.table_units
                .iter()
                .filter(|u| u.logic_table.eq_ignore_ascii_case(logic_table))
                .map(|u| u.actual_table.clone()),
        )
    }
}

/// Outcome of routing one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingResult {
    units: Vec<RoutingUnit>,
    full_route: bool,
}

impl RoutingResult {
    /// Units ordered by datasource name
    pub fn units(&self) -> &[RoutingUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<RoutingUnit> {
        self.units
    }

    /// True when some table could not be narrowed by any predicate
    pub fn is_full_route(&self) -> bool {
        self.full_route
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_single_unit(&self) -> bool {
        self.units.len() == 1
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.data_source.clone()).collect()
    }

    pub fn unit(&self, data_source: &str) -> Option<&RoutingUnit> {
        self.units
            .iter()
            .find(|u| u.data_source.eq_ignore_ascii_case(data_source))
    }

    /// Whether `actual_table` on `data_source` is addressed
    pub fn contains(&self, data_source: &str, actual_table: &str) -> bool {
        self.unit(data_source).is_some_and(|u| {
            u.table_units
                .iter()
                .any(|t| t.actual_table.eq_ignore_ascii_case(actual_table))
        })
    }

    /// Every (datasource, actual table) pair, ordered
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.units
            .iter()
            .flat_map(|u| {
                u.actual_tables()
                    .into_iter()
                    .map(move |t| (u.data_source.clone(), t))
            })
            .collect()
    }
}

type UnitKey = (String, String);

/// Accumulates table units grouped by datasource, ignoring case
#[derive(Debug, Default)]
pub(crate) struct RoutingResultBuilder {
    units: BTreeMap<String, (String, BTreeMap<UnitKey, TableUnit>)>,
    full_route: bool,
}

impl RoutingResultBuilder {
    pub(crate) fn add(&mut self, data_source: &str, logic_table: &str, actual_table: &str) {
        let (_, tables) = self
            .units
            .entry(data_source.to_ascii_lowercase())
            .or_insert_with(|| (data_source.to_string(), BTreeMap::new()));
        tables
            .entry((logic_table.to_ascii_lowercase(), actual_table.to_ascii_lowercase()))
            .or_insert_with(|| TableUnit {
                logic_table: logic_table.to_string(),
                actual_table: actual_table.to_string(),
            });
    }

    /// Register a datasource that receives the statement without any table
    pub(crate) fn add_data_source(&mut self, data_source: &str) {
        self.units
            .entry(data_source.to_ascii_lowercase())
            .or_insert_with(|| (data_source.to_string(), BTreeMap::new()));
    }

    pub(crate) fn mark_full_route(&mut self) {
        self.full_route = true;
    }

    pub(crate) fn build(self) -> RoutingResult {
        let units = self
            .units
            .into_values()
            .map(|(data_source, tables)| RoutingUnit {
                data_source,
                table_units: tables.into_values().collect(),
            })
            .collect();
        RoutingResult {
            units,
            full_route: self.full_route,
        }
    }
}
