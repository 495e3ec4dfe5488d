//! Sharding strategies
//!
//! A strategy narrows a set of candidate names (datasources or actual
//! tables) using the values extracted from a statement:
//!
//! - **None**: ignores values, everything stays a candidate
//! - **Standard**: one column; precise algorithm for `EQUAL`, range
//!   algorithm for `IN` / `BETWEEN`
//! - **Complex**: several columns handed to one algorithm together
//! - **Hint**: ignores the statement, reads values from the hint context
//! - **Inline**: one column and an expression such as `t_${id % 2}`
//! - **Custom**: anything implementing [`CustomShardingStrategy`]
//!
//! Whatever the variant, the outcome is restricted to the available names.
//! When nothing usable narrows the scope the strategy answers with every
//! available name and flags the decision as a full route. The result is
//! never empty unless nothing was available.

use crate::algorithm::{
    ComplexKeysShardingAlgorithm, HintShardingAlgorithm, PreciseShardingAlgorithm,
    RangeShardingAlgorithm,
};
use crate::error::{ConfigurationError, Result};
use crate::expression::InlineExpression;
use crate::targets;
use crate::value::{Literal, ShardingOperator, ShardingValue};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Extension point for strategies outside the built-in set
pub trait CustomShardingStrategy: fmt::Debug + Send + Sync {
    /// Columns the strategy reads
    fn sharding_columns(&self) -> Vec<String>;

    /// Propose targets; an empty answer means "cannot decide"
    fn shard(&self, targets: &[String], values: &[&ShardingValue], hints: &[Literal]) -> Vec<String>;
}

/// Result of evaluating one strategy over one candidate set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDecision {
    /// Surviving candidates, ascending ignoring case
    pub targets: Vec<String>,
    /// True when no value narrowed the candidates
    pub full_route: bool,
}

impl StrategyDecision {
    fn full(available: &[String]) -> Self {
        Self {
            targets: targets::normalize(available.iter().cloned()),
            full_route: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StandardStrategy {
    column: String,
    precise: Arc<dyn PreciseShardingAlgorithm>,
    range: Option<Arc<dyn RangeShardingAlgorithm>>,
}

impl StandardStrategy {
    pub fn new(
        column: impl Into<String>,
        precise: Arc<dyn PreciseShardingAlgorithm>,
        range: Option<Arc<dyn RangeShardingAlgorithm>>,
    ) -> Result<Self> {
        let column: String = column.into();
        if column.trim().is_empty() {
            return Err(ConfigurationError::InvalidStrategy(
                "standard strategy needs a sharding column".to_string(),
            ));
        }
        Ok(Self {
            column: column.trim().to_string(),
            precise,
            range,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    fn propose(&self, available: &[String], values: &[&ShardingValue]) -> Option<Vec<String>> {
        let picks: Vec<Vec<String>> = values
            .iter()
            .filter(|v| v.is_column(&self.column) && v.is_usable())
            .filter_map(|v| {
                let picked = match v.operator {
                    ShardingOperator::Equal => self.precise.shard(available, &self.column, &v.values[0]),
                    ShardingOperator::In | ShardingOperator::Between => {
                        self.range.as_ref()?.shard(available, v)
                    }
                };
                (!picked.is_empty()).then_some(picked)
            })
            .collect();
        combine(picks)
    }
}

#[derive(Debug, Clone)]
pub struct ComplexStrategy {
    columns: Vec<String>,
    algorithm: Arc<dyn ComplexKeysShardingAlgorithm>,
}

impl ComplexStrategy {
    pub fn new<I, S>(columns: I, algorithm: Arc<dyn ComplexKeysShardingAlgorithm>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared: Vec<String> = Vec::new();
        for column in columns {
            let column: String = column.into();
            let column = column.trim();
            if column.is_empty() {
                continue;
            }
            if !declared.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                declared.push(column.to_string());
            }
        }
        if declared.is_empty() {
            return Err(ConfigurationError::InvalidStrategy(
                "complex strategy needs at least one sharding column".to_string(),
            ));
        }
        Ok(Self {
            columns: declared,
            algorithm,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Every declared column needs at least one usable value
    fn propose(&self, available: &[String], values: &[&ShardingValue]) -> Option<Vec<String>> {
        let matching: Vec<&ShardingValue> = values
            .iter()
            .copied()
            .filter(|v| v.is_usable() && self.columns.iter().any(|c| v.is_column(c)))
            .collect();
        let covered = self
            .columns
            .iter()
            .all(|c| matching.iter().any(|v| v.is_column(c)));
        if !covered {
            return None;
        }
        let picked = self.algorithm.shard(available, &matching);
        (!picked.is_empty()).then_some(picked)
    }
}

#[derive(Debug, Clone)]
pub struct HintStrategy {
    algorithm: Arc<dyn HintShardingAlgorithm>,
}

impl HintStrategy {
    pub fn new(algorithm: Arc<dyn HintShardingAlgorithm>) -> Self {
        Self { algorithm }
    }

    fn propose(&self, available: &[String], hints: &[Literal]) -> Option<Vec<String>> {
        if hints.is_empty() {
            return None;
        }
        let picked = self.algorithm.shard(available, hints);
        (!picked.is_empty()).then_some(picked)
    }
}

#[derive(Debug, Clone)]
pub struct InlineStrategy {
    column: String,
    expression: InlineExpression,
}

impl InlineStrategy {
    /// The expression must reference exactly the sharding column
    pub fn new(column: impl Into<String>, expression: &str) -> Result<Self> {
        let column: String = column.into();
        let column = column.trim().to_string();
        let expression = InlineExpression::parse(expression)?;
        let referenced = expression.columns();
        if referenced.len() != 1 || !referenced[0].eq_ignore_ascii_case(&column) {
            return Err(ConfigurationError::InvalidStrategy(format!(
                "inline expression '{}' must reference only column '{}'",
                expression.source(),
                column
            )));
        }
        Ok(Self { column, expression })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// `BETWEEN` cannot be evaluated by an expression and counts as unusable
    fn propose(&self, values: &[&ShardingValue]) -> Option<Vec<String>> {
        let picks: Vec<Vec<String>> = values
            .iter()
            .filter(|v| v.is_column(&self.column) && v.is_usable())
            .filter(|v| v.operator != ShardingOperator::Between)
            .filter_map(|v| {
                v.values
                    .iter()
                    .map(|literal| self.expression.evaluate(literal))
                    .collect::<Option<Vec<String>>>()
            })
            .collect();
        combine(picks)
    }
}

/// AND of several predicates on the same column: intersect their picks
fn combine(picks: Vec<Vec<String>>) -> Option<Vec<String>> {
    match picks.len() {
        0 => None,
        1 => picks.into_iter().next(),
        _ => Some(targets::intersect(&picks)),
    }
}

/// Closed set of strategy kinds plus one custom extension point
#[derive(Debug, Clone, Default)]
pub enum ShardingStrategy {
    #[default]
    None,
    Standard(StandardStrategy),
    Complex(ComplexStrategy),
    Hint(HintStrategy),
    Inline(InlineStrategy),
    Custom(Arc<dyn CustomShardingStrategy>),
}

impl ShardingStrategy {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ShardingStrategy::None => "none",
            ShardingStrategy::Standard(_) => "standard",
            ShardingStrategy::Complex(_) => "complex",
            ShardingStrategy::Hint(_) => "hint",
            ShardingStrategy::Inline(_) => "inline",
            ShardingStrategy::Custom(_) => "custom",
        }
    }

    /// Columns the strategy reads from statements
    pub fn sharding_columns(&self) -> Vec<String> {
        match self {
            ShardingStrategy::None | ShardingStrategy::Hint(_) => Vec::new(),
            ShardingStrategy::Standard(s) => vec![s.column.clone()],
            ShardingStrategy::Complex(s) => s.columns.clone(),
            ShardingStrategy::Inline(s) => vec![s.column.clone()],
            ShardingStrategy::Custom(s) => s.sharding_columns(),
        }
    }

    /// Narrow `available` using statement values and hint values.
    ///
    /// Names proposed by an algorithm that are not available are dropped.
    /// If nothing survives, the decision falls back to a full route.
    pub fn route(
        &self,
        available: &[String],
        values: &[&ShardingValue],
        hints: &[Literal],
    ) -> StrategyDecision {
        if available.is_empty() {
            return StrategyDecision {
                targets: Vec::new(),
                full_route: false,
            };
        }

        let proposed = match self {
            ShardingStrategy::None => None,
            ShardingStrategy::Standard(s) => s.propose(available, values),
            ShardingStrategy::Complex(s) => s.propose(available, values),
            ShardingStrategy::Hint(s) => s.propose(available, hints),
            ShardingStrategy::Inline(s) => s.propose(values),
            ShardingStrategy::Custom(s) => {
                let picked = s.shard(available, values, hints);
                (!picked.is_empty()).then_some(picked)
            }
        };

        let Some(proposed) = proposed else {
            return StrategyDecision::full(available);
        };

        let (kept, dropped) = targets::restrict(available, proposed);
        if !dropped.is_empty() {
            warn!(
                strategy = self.kind(),
                dropped = ?dropped,
                "Sharding algorithm named targets outside the available set"
            );
        }
        if kept.is_empty() {
            debug!(strategy = self.kind(), "No proposed target survived, falling back to full route");
            return StrategyDecision::full(available);
        }
        StrategyDecision {
            targets: kept,
            full_route: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::ModuloAlgorithm;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn modulo_standard(column: &str) -> ShardingStrategy {
        let algo = Arc::new(ModuloAlgorithm::new());
        let range: Arc<dyn RangeShardingAlgorithm> = algo.clone();
        ShardingStrategy::Standard(StandardStrategy::new(column, algo, Some(range)).unwrap())
    }

    #[derive(Debug)]
    struct FixedStrategy(Vec<String>);

    impl CustomShardingStrategy for FixedStrategy {
        fn sharding_columns(&self) -> Vec<String> {
            Vec::new()
        }

        fn shard(&self, _: &[String], _: &[&ShardingValue], _: &[Literal]) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_none_returns_everything() {
        let available = names(&["ds1", "ds0"]);
        let value = ShardingValue::equal("t", "id", 1);
        let decision = ShardingStrategy::None.route(&available, &[&value], &[]);
        assert_eq!(decision.targets, names(&["ds0", "ds1"]));
        assert!(decision.full_route);
    }

    #[test]
    fn test_standard_precise() {
        let available = names(&["t_0", "t_1"]);
        let value = ShardingValue::equal("t", "order_id", 3);
        let decision = modulo_standard("order_id").route(&available, &[&value], &[]);
        assert_eq!(decision.targets, names(&["t_1"]));
        assert!(!decision.full_route);
    }

    #[test]
    fn test_standard_column_case_insensitive() {
        let available = names(&["t_0", "t_1"]);
        let value = ShardingValue::equal("t", "Order_Id", 3);
        let decision = modulo_standard("order_id").route(&available, &[&value], &[]);
        assert_eq!(decision.targets, names(&["t_1"]));
    }

    #[test]
    fn test_standard_missing_value_is_full_route() {
        let available = names(&["t_0", "t_1"]);
        let other = ShardingValue::equal("t", "user_id", 3);
        let decision = modulo_standard("order_id").route(&available, &[&other], &[]);
        assert_eq!(decision.targets, available);
        assert!(decision.full_route);
    }

    #[test]
    fn test_standard_without_range_algorithm() {
        let algo = Arc::new(ModuloAlgorithm::new());
        let strategy =
            ShardingStrategy::Standard(StandardStrategy::new("order_id", algo, None).unwrap());
        let available = names(&["t_0", "t_1"]);
        let value = ShardingValue::between("t", "order_id", 1, 1);
        let decision = strategy.route(&available, &[&value], &[]);
        assert!(decision.full_route);
        assert_eq!(decision.targets.len(), 2);
    }

    #[test]
    fn test_standard_intersects_multiple_predicates() {
        let available = names(&["t_0", "t_1", "t_2", "t_3"]);
        let range = ShardingValue::between("t", "order_id", 1, 2);
        let eq = ShardingValue::equal("t", "order_id", 2);
        let decision = modulo_standard("order_id").route(&available, &[&range, &eq], &[]);
        assert_eq!(decision.targets, names(&["t_2"]));
    }

    #[test]
    fn test_contradiction_falls_back_to_full_route() {
        let available = names(&["t_0", "t_1"]);
        let a = ShardingValue::equal("t", "order_id", 1);
        let b = ShardingValue::equal("t", "order_id", 2);
        let decision = modulo_standard("order_id").route(&available, &[&a, &b], &[]);
        assert!(decision.full_route);
        assert_eq!(decision.targets, available);
    }

    #[test]
    fn test_complex_requires_every_column() {
        let algo = Arc::new(ModuloAlgorithm::new());
        let strategy = ShardingStrategy::Complex(
            ComplexStrategy::new(["user_id", "order_id"], algo).unwrap(),
        );
        let available = names(&["t_0", "t_1"]);
        let user = ShardingValue::equal("t", "USER_ID", 1);
        let order = ShardingValue::equal("t", "order_id", 3);

        let partial = strategy.route(&available, &[&user], &[]);
        assert!(partial.full_route);

        let full = strategy.route(&available, &[&user, &order], &[]);
        assert_eq!(full.targets, names(&["t_1"]));
        assert!(!full.full_route);
    }

    #[test]
    fn test_complex_rejects_empty_columns() {
        let algo = Arc::new(ModuloAlgorithm::new());
        assert!(ComplexStrategy::new(Vec::<String>::new(), algo).is_err());
    }

    #[test]
    fn test_hint_ignores_statement_values() {
        let strategy = ShardingStrategy::Hint(HintStrategy::new(Arc::new(ModuloAlgorithm::new())));
        let available = names(&["ds0", "ds1"]);
        let value = ShardingValue::equal("t", "id", 1);

        let without_hint = strategy.route(&available, &[&value], &[]);
        assert!(without_hint.full_route);

        let with_hint = strategy.route(&available, &[], &[Literal::Integer(2)]);
        assert_eq!(with_hint.targets, names(&["ds0"]));
    }

    #[test]
    fn test_inline_strategy() {
        let strategy =
            ShardingStrategy::Inline(InlineStrategy::new("order_id", "t_${order_id % 2}").unwrap());
        let available = names(&["t_0", "t_1"]);

        let eq = ShardingValue::equal("t", "order_id", 7);
        assert_eq!(strategy.route(&available, &[&eq], &[]).targets, names(&["t_1"]));

        let list = ShardingValue::in_list("t", "order_id", [1, 2]);
        assert_eq!(strategy.route(&available, &[&list], &[]).targets, available);

        let between = ShardingValue::between("t", "order_id", 1, 2);
        assert!(strategy.route(&available, &[&between], &[]).full_route);
    }

    #[test]
    fn test_inline_column_must_match_expression() {
        assert!(InlineStrategy::new("user_id", "t_${order_id % 2}").is_err());
    }

    #[test]
    fn test_foreign_targets_are_filtered() {
        let strategy = ShardingStrategy::Custom(Arc::new(FixedStrategy(names(&["t_1", "t_9"]))));
        let available = names(&["t_0", "t_1"]);
        let decision = strategy.route(&available, &[], &[]);
        assert_eq!(decision.targets, names(&["t_1"]));
        assert!(!decision.full_route);
    }

    #[test]
    fn test_only_foreign_targets_means_full_route() {
        let strategy = ShardingStrategy::Custom(Arc::new(FixedStrategy(names(&["t_9"]))));
        let available = names(&["t_0", "t_1"]);
        let decision = strategy.route(&available, &[], &[]);
        assert_eq!(decision.targets, available);
        assert!(decision.full_route);
    }

    #[test]
    fn test_empty_available_stays_empty() {
        let decision = modulo_standard("id").route(&[], &[], &[]);
        assert!(decision.targets.is_empty());
    }
}
