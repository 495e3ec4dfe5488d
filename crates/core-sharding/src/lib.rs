//! Shardgate Core Sharding: Pure-logic statement routing over sharded tables
//!
//! # Overview
//!
//! Given the logical tables a statement references and the predicate values
//! extracted from it, this crate decides which physical (datasource, table)
//! pairs the statement must reach. It includes:
//!
//! - **Sharding strategies**: none, standard, complex, hint, inline and a
//!   custom extension point, each narrowing a set of candidate names
//! - **Algorithms**: advisory traits plus the built-in `modulo` and `hash_mod`
//! - **Rules**: per-table actual data nodes expanded from compact notation,
//!   binding groups and broadcast tables, validated once at build time
//! - **Routing engine**: merges per-table decisions into one [`RoutingResult`]
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - SQL parsing (values arrive already extracted)
//! - Connections, rewriting or execution
//! - Master/slave replicas (see `shardgate-core-replica`)
//!
//! Routing never blocks and never fails on an unusable predicate: when no
//! value narrows a table, it reaches every actual data node and the result
//! is flagged as a full route.
//!
//! # Architecture
//!
//! ```text
//!   ShardingContext (tables + values)      HintContext (optional)
//!               │                                  │
//!               ▼                                  ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    RoutingEngine                        │
//! │  classify: broadcast / sharded / unmanaged              │
//! │  sharded:  database strategy → table strategy per ds    │
//! │  binding:  followers reuse the driver's node positions  │
//! └─────────────┬───────────────────────────────────────────┘
//!               ▼
//!         RoutingResult { units per datasource, full_route }
//! ```
//!
//! # Usage Example
//!
//! ```
//! use shardgate_core_sharding::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), ConfigurationError> {
//! let modulo = Arc::new(ModuloAlgorithm::new());
//! let range: Arc<dyn RangeShardingAlgorithm> = modulo.clone();
//! let strategy = ShardingStrategy::Standard(StandardStrategy::new("order_id", modulo, Some(range))?);
//!
//! let rules = ShardingRuleSet::builder()
//!     .rule(
//!         ShardingRule::from_expression("t_order", "ds${0..1}.t_order_${0..1}")?
//!             .with_database_strategy(strategy.clone())
//!             .with_table_strategy(strategy),
//!     )
//!     .build()?;
//!
//! let context = ShardingContext::new().with_value(ShardingValue::equal("t_order", "order_id", 3));
//! let result = RoutingEngine::new(&rules).route(&context, None)?;
//! assert!(result.contains("ds1", "t_order_1"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod algorithm;
pub mod engine;
pub mod error;
pub mod expression;
pub mod hint;
pub mod node;
pub mod result;
pub mod rule;
pub mod strategy;
pub mod targets;
pub mod value;

// Re-export main types for convenience
pub use algorithm::{
    AlgorithmRegistry, ComplexKeysShardingAlgorithm, HashModAlgorithm, HintShardingAlgorithm,
    ModuloAlgorithm, PreciseShardingAlgorithm, RangeShardingAlgorithm,
};
pub use engine::{RoutingEngine, ShardingContext};
pub use error::{ConfigurationError, Result};
pub use expression::InlineExpression;
pub use hint::HintContext;
pub use node::DataNode;
pub use result::{RoutingResult, RoutingUnit, TableUnit};
pub use rule::{BindingTableRule, ShardingRule, ShardingRuleSet, ShardingRuleSetBuilder, TableKind};
pub use strategy::{
    ComplexStrategy, CustomShardingStrategy, HintStrategy, InlineStrategy, ShardingStrategy,
    StandardStrategy, StrategyDecision,
};
pub use value::{Literal, ShardingOperator, ShardingValue};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::algorithm::{
        AlgorithmRegistry, ModuloAlgorithm, PreciseShardingAlgorithm, RangeShardingAlgorithm,
    };
    pub use super::engine::{RoutingEngine, ShardingContext};
    pub use super::error::ConfigurationError;
    pub use super::hint::HintContext;
    pub use super::result::RoutingResult;
    pub use super::rule::{ShardingRule, ShardingRuleSet};
    pub use super::strategy::{ShardingStrategy, StandardStrategy};
    pub use super::value::{Literal, ShardingValue};
}
