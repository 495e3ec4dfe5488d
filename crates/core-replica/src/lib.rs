//! Shardgate Core Replica: Pure-logic master/slave read routing
//!
//! # Overview
//!
//! After sharding has chosen logical datasources, each one is mapped to a
//! concrete replica:
//!
//! - **Writes** always reach the master
//! - **Reads** load-balance across slaves (round-robin or random), falling
//!   back to the master when a datasource has no slave
//! - **Transactions** become sticky: once a transaction writes, or is forced
//!   onto the master, every later statement in it reaches the master until
//!   commit or rollback
//!
//! Rules are immutable once built and safe to share across threads. A
//! [`Session`] belongs to exactly one connection.
//!
//! # Usage Example
//!
//! ```
//! use shardgate_core_replica::prelude::*;
//!
//! # fn example() -> Result<(), ReplicaError> {
//! let rules = MasterSlaveRuleSet::new(vec![MasterSlaveRule::new(
//!     "ds0",
//!     "ds0_master",
//!     ["ds0_slave0"],
//!     LoadBalanceKind::RoundRobin,
//! )?])?;
//! let router = MasterSlaveRouter::new(&rules);
//! let mut session = Session::new();
//!
//! let read = router.route(["ds0"], &mut session, StatementKind::Read, false);
//! assert_eq!(read[0].data_source, "ds0_slave0");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod error;
pub mod load_balance;
pub mod router;
pub mod rule;
pub mod session;

// Re-export main types for convenience
pub use error::{ReplicaError, Result};
pub use load_balance::{LoadBalanceAlgorithm, LoadBalanceKind, RandomLoadBalance, RoundRobinLoadBalance};
pub use router::{MasterSlaveRouter, ReplicaRole, ResolvedDataSource};
pub use rule::{MasterSlaveRule, MasterSlaveRuleSet};
pub use session::{RouteIntent, Session, StatementKind, TransactionState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::error::ReplicaError;
    pub use super::load_balance::LoadBalanceKind;
    pub use super::router::{MasterSlaveRouter, ReplicaRole};
    pub use super::rule::{MasterSlaveRule, MasterSlaveRuleSet};
    pub use super::session::{Session, StatementKind};
}
