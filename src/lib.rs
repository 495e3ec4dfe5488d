/*!
 * Shardgate - sharding and master/slave routing for distributed SQL
 *
 * Turns "statement + rules" into physical targets:
 * - Sharding rules, binding and broadcast tables (`shardgate-core-sharding`)
 * - Master/slave read routing with transaction stickiness (`shardgate-core-replica`)
 * - TOML configuration built into immutable, atomically swapped snapshots
 * - Coordination hooks for cross-instance configuration reload
 * - A prepared-statement registry shared by sessions
 */

pub mod config;
pub mod coordination;
pub mod error;
pub mod logging;
pub mod registry;
pub mod router;
pub mod snapshot;

// Re-export commonly used types
pub use config::{LogConfig, LogLevel, RoutingConfig, StrategyConfig};
pub use coordination::{Coordinator, LockNode, MemoryCoordinator, ReloadListener};
pub use error::{Error, Result};
pub use registry::{PreparedStatement, PreparedStatementRegistry};
pub use router::{PhysicalRoute, PhysicalUnit, Router, StatementContext};
pub use snapshot::{RuleSnapshot, SnapshotHolder};

pub use shardgate_core_replica as replica;
pub use shardgate_core_sharding as sharding;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
