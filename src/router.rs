/*!
 * Statement routing facade: sharding first, then master/slave resolution
 */

use crate::error::Result;
use crate::snapshot::SnapshotHolder;
use serde::Serialize;
use shardgate_core_replica::{MasterSlaveRouter, ReplicaRole, Session, StatementKind};
use shardgate_core_sharding::{HintContext, RoutingEngine, ShardingContext, TableUnit};
use std::sync::Arc;
use tracing::debug;

/// One statement as seen by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementContext {
    pub sharding: ShardingContext,
    pub kind: StatementKind,
}

impl StatementContext {
    pub fn read(sharding: ShardingContext) -> Self {
        Self {
            sharding,
            kind: StatementKind::Read,
        }
    }

    pub fn write(sharding: ShardingContext) -> Self {
        Self {
            sharding,
            kind: StatementKind::Write,
        }
    }
}

/// One physical datasource and the tables to address on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalUnit {
    pub data_source: String,
    pub logical_data_source: String,
    pub role: ReplicaRole,
    pub table_units: Vec<TableUnit>,
}

/// Final targets of one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalRoute {
    pub units: Vec<PhysicalUnit>,
    pub full_route: bool,
    /// Snapshot the statement was routed against
    pub snapshot_version: u64,
}

impl PhysicalRoute {
    pub fn data_source_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.data_source.as_str()).collect()
    }
}

/// Routes statements against whatever snapshot is current.
///
/// Cheap to clone; every clone shares the same [`SnapshotHolder`].
#[derive(Debug, Clone)]
pub struct Router {
    holder: Arc<SnapshotHolder>,
}

impl Router {
    pub fn new(holder: Arc<SnapshotHolder>) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> &Arc<SnapshotHolder> {
        &self.holder
    }

    /// Route one statement.
    ///
    /// The hint is consumed and dropped before returning, so it can never
    /// apply to a later statement. The session only advances when sharding
    /// succeeds.
    pub fn route(
        &self,
        statement: &StatementContext,
        session: &mut Session,
        hint: Option<HintContext>,
    ) -> Result<PhysicalRoute> {
        let (version, snapshot) = self.holder.load_versioned();
        let result = RoutingEngine::new(snapshot.sharding()).route(&statement.sharding, hint.as_ref())?;
        let force_master = hint.is_some_and(|h| h.is_master_route_only());

        let resolved = MasterSlaveRouter::new(snapshot.master_slave()).route(
            result.data_source_names(),
            session,
            statement.kind,
            force_master,
        );
        let full_route = result.is_full_route();
        let units: Vec<PhysicalUnit> = result
            .into_units()
            .into_iter()
            .zip(resolved)
            .map(|(unit, resolved)| PhysicalUnit {
                data_source: resolved.data_source,
                logical_data_source: resolved.logical,
                role: resolved.role,
                table_units: unit.table_units,
            })
            .collect();

        debug!(
            version,
            kind = ?statement.kind,
            units = units.len(),
            full_route,
            "Routed statement"
        );
        Ok(PhysicalRoute {
            units,
            full_route,
            snapshot_version: version,
        })
    }
}
