//! Explicit hint values for statements whose SQL cannot carry a sharding key
//!
//! A `HintContext` is built by the caller for exactly one statement and moved
//! into the routing call, so its values are gone once that statement has
//! been routed.

use crate::value::Literal;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintContext {
    database_values: HashMap<String, Vec<Literal>>,
    table_values: HashMap<String, Vec<Literal>>,
    master_route_only: bool,
}

impl HintContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for the database-level hint strategy of `logic_table`
    pub fn add_database_value(&mut self, logic_table: &str, value: impl Into<Literal>) -> &mut Self {
        self.database_values
            .entry(logic_table.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Add a value for the table-level hint strategy of `logic_table`
    pub fn add_table_value(&mut self, logic_table: &str, value: impl Into<Literal>) -> &mut Self {
        self.table_values
            .entry(logic_table.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Force the statement onto master datasources
    pub fn set_master_route_only(&mut self) -> &mut Self {
        self.master_route_only = true;
        self
    }

    pub fn database_values(&self, logic_table: &str) -> &[Literal] {
        self.database_values
            .get(&logic_table.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn table_values(&self, logic_table: &str) -> &[Literal] {
        self.table_values
            .get(&logic_table.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_master_route_only(&self) -> bool {
        self.master_route_only
    }

    pub fn is_empty(&self) -> bool {
        self.database_values.is_empty() && self.table_values.is_empty() && !self.master_route_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_keyed_by_table_ignoring_case() {
        let mut hint = HintContext::new();
        hint.add_database_value("T_Order", 1).add_table_value("t_order", 3);

        assert_eq!(hint.database_values("t_order"), &[Literal::Integer(1)]);
        assert_eq!(hint.table_values("T_ORDER"), &[Literal::Integer(3)]);
        assert!(hint.database_values("t_order_item").is_empty());
        assert!(!hint.is_empty());
    }

    #[test]
    fn test_master_route_only() {
        let mut hint = HintContext::new();
        assert!(hint.is_empty());
        hint.set_master_route_only();
        assert!(hint.is_master_route_only());
        assert!(!hint.is_empty());
    }
}
