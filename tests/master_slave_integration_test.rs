//! Integration tests for master/slave resolution through the router

use shardgate::replica::{ReplicaError, ReplicaRole, Session, TransactionState};
use shardgate::sharding::{AlgorithmRegistry, ShardingContext, ShardingValue};
use shardgate::{Router, RoutingConfig, RuleSnapshot, SnapshotHolder, StatementContext};
use std::collections::HashSet;
use std::sync::Arc;

const RULES: &str = r#"
default_data_source = "ds0"

[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds${0..1}.t_order"
database_strategy = { type = "standard", column = "order_id", precise = "modulo" }

[[master_slave]]
name = "ds0"
master = "ds0_master"
slaves = ["ds0_slave0", "ds0_slave1"]
load_balance = "round_robin"

[[master_slave]]
name = "ds1"
master = "ds1_master"
load_balance = "random"
"#;

fn router() -> Router {
    let config = RoutingConfig::from_toml_str(RULES).unwrap();
    let snapshot = RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins()).unwrap();
    Router::new(Arc::new(SnapshotHolder::new(snapshot)))
}

fn order(order_id: i64) -> ShardingContext {
    ShardingContext::new().with_value(ShardingValue::equal("t_order", "order_id", order_id))
}

fn route_one(router: &Router, session: &mut Session, statement: StatementContext) -> (String, ReplicaRole) {
    let route = router.route(&statement, session, None).unwrap();
    assert_eq!(route.units.len(), 1);
    (route.units[0].data_source.clone(), route.units[0].role)
}

#[test]
fn test_transaction_stickiness() {
    let router = router();
    let mut session = Session::new();

    session.begin().unwrap();
    let (_, role) = route_one(&router, &mut session, StatementContext::read(order(0)));
    assert_eq!(role, ReplicaRole::Slave, "clean transaction still reads from slaves");

    let (ds, _) = route_one(&router, &mut session, StatementContext::write(order(0)));
    assert_eq!(ds, "ds0_master");
    let (ds, _) = route_one(&router, &mut session, StatementContext::read(order(0)));
    assert_eq!(ds, "ds0_master", "read after write in a transaction stays on master");
    assert_eq!(session.state(), TransactionState::InTransactionDirty);

    session.commit().unwrap();
    let (_, role) = route_one(&router, &mut session, StatementContext::read(order(0)));
    assert_eq!(role, ReplicaRole::Slave);
}

#[test]
fn test_reads_spread_over_slaves() {
    let router = router();
    let mut session = Session::new();
    let seen: HashSet<String> = (0..4)
        .map(|_| route_one(&router, &mut session, StatementContext::read(order(2))).0)
        .collect();
    let expected: HashSet<String> = ["ds0_slave0", "ds0_slave1"].iter().map(|s| s.to_string()).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_datasource_without_slaves_reads_master() {
    let router = router();
    let mut session = Session::new();
    let (ds, role) = route_one(&router, &mut session, StatementContext::read(order(1)));
    assert_eq!(ds, "ds1_master");
    assert_eq!(role, ReplicaRole::Master);
}

#[test]
fn test_table_less_statement_uses_default() {
    let router = router();
    let mut session = Session::new();
    let route = router
        .route(&StatementContext::read(ShardingContext::new()), &mut session, None)
        .unwrap();
    assert_eq!(route.units.len(), 1);
    assert_eq!(route.units[0].logical_data_source, "ds0");
    assert!(route.units[0].table_units.is_empty());
}

#[test]
fn test_sessions_are_independent() {
    let router = router();
    let mut writer = Session::new();
    let mut reader = Session::new();

    writer.begin().unwrap();
    route_one(&router, &mut writer, StatementContext::write(order(0)));

    let (_, role) = route_one(&router, &mut reader, StatementContext::read(order(0)));
    assert_eq!(role, ReplicaRole::Slave);
}

#[test]
fn test_commit_without_begin() {
    let mut session = Session::new();
    assert!(matches!(
        session.commit(),
        Err(ReplicaError::TransactionState { operation: "commit", .. })
    ));
}
