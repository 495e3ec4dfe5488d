//! Resolution of logical datasources into concrete replicas

use crate::rule::MasterSlaveRuleSet;
use crate::session::{RouteIntent, Session, StatementKind};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaRole {
    Master,
    Slave,
    /// No master/slave rule covers the name; it is used as is
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedDataSource {
    /// Physical datasource to connect to
    pub data_source: String,
    /// Name the sharding layer chose
    pub logical: String,
    pub role: ReplicaRole,
}

#[derive(Debug, Clone, Copy)]
pub struct MasterSlaveRouter<'a> {
    rules: &'a MasterSlaveRuleSet,
}

impl<'a> MasterSlaveRouter<'a> {
    pub fn new(rules: &'a MasterSlaveRuleSet) -> Self {
        Self { rules }
    }

    /// Map one logical datasource for an already decided intent
    pub fn resolve(&self, logical: &str, intent: RouteIntent) -> ResolvedDataSource {
        let Some(rule) = self.rules.rule(logical) else {
            return ResolvedDataSource {
                data_source: logical.to_string(),
                logical: logical.to_string(),
                role: ReplicaRole::Direct,
            };
        };

        let (data_source, role) = match intent {
            RouteIntent::Master => (rule.master(), ReplicaRole::Master),
            RouteIntent::LoadBalance if rule.slaves().is_empty() => {
                debug!(logical, "No slave configured, reading from master");
                (rule.master(), ReplicaRole::Master)
            }
            RouteIntent::LoadBalance => (rule.read_target(), ReplicaRole::Slave),
        };
        ResolvedDataSource {
            data_source: data_source.to_string(),
            logical: logical.to_string(),
            role,
        }
    }

    /// Advance the session once for the statement, then map every name
    pub fn route<I, S>(
        &self,
        logical_names: I,
        session: &mut Session,
        kind: StatementKind,
        force_master: bool,
    ) -> Vec<ResolvedDataSource>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let intent = session.on_statement(kind, force_master);
        logical_names
            .into_iter()
            .map(|name| self.resolve(name.as_ref(), intent))
            .collect()
    }
}
