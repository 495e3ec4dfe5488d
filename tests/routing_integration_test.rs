//! Integration tests for statement routing
//!
//! Rules are loaded from TOML the way a deployment would load them, then
//! statements are routed through the public `Router`.

use shardgate::replica::{ReplicaRole, Session};
use shardgate::sharding::{AlgorithmRegistry, ConfigurationError, HintContext, ShardingContext, ShardingValue};
use shardgate::{Error, Router, RoutingConfig, RuleSnapshot, SnapshotHolder, StatementContext};
use std::sync::Arc;

const RULES: &str = r#"
data_sources = ["ds0", "ds1"]
broadcast_tables = ["t_config"]
binding_tables = [["t_order", "t_order_item"]]

[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds${0..1}.t_order_${0..1}"
database_strategy = { type = "standard", column = "order_id", precise = "modulo", range = "modulo" }
table_strategy = { type = "standard", column = "order_id", precise = "modulo", range = "modulo" }

[[tables]]
logic_table = "t_order_item"
actual_data_nodes = "ds${0..1}.t_order_item_${0..1}"
database_strategy = { type = "standard", column = "order_id", precise = "modulo" }
table_strategy = { type = "standard", column = "order_id", precise = "modulo" }

[[tables]]
logic_table = "t_user"
actual_data_nodes = "ds${0..1}.t_user"
database_strategy = { type = "inline", column = "user_id", expression = "ds${user_id % 2}" }

[[tables]]
logic_table = "t_log"
actual_data_nodes = "ds0.t_log_${0..3}"
table_strategy = { type = "hint", algorithm = "modulo" }
"#;

fn router_for(rules: &str) -> Router {
    let config = RoutingConfig::from_toml_str(rules).unwrap();
    let snapshot = RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins()).unwrap();
    Router::new(Arc::new(SnapshotHolder::new(snapshot)))
}

fn targets(router: &Router, context: ShardingContext) -> Vec<(String, String)> {
    let mut session = Session::new();
    let route = router
        .route(&StatementContext::read(context), &mut session, None)
        .unwrap();
    route
        .units
        .iter()
        .flat_map(|u| {
            u.table_units
                .iter()
                .map(move |t| (u.data_source.clone(), t.actual_table.clone()))
        })
        .collect()
}

fn pair(ds: &str, table: &str) -> (String, String) {
    (ds.to_string(), table.to_string())
}

#[test]
fn test_precise_route() {
    let router = router_for(RULES);
    let context = ShardingContext::new().with_value(ShardingValue::equal("t_order", "order_id", 3));
    assert_eq!(targets(&router, context), vec![pair("ds1", "t_order_1")]);
}

#[test]
fn test_full_route_without_predicate() {
    let router = router_for(RULES);
    let mut session = Session::new();
    let route = router
        .route(
            &StatementContext::read(ShardingContext::new().with_table("t_order")),
            &mut session,
            None,
        )
        .unwrap();
    assert!(route.full_route);
    let count: usize = route.units.iter().map(|u| u.table_units.len()).sum();
    assert_eq!(count, 4);
}

#[test]
fn test_in_list_narrows_each_dimension() {
    let router = router_for(RULES);
    let context = ShardingContext::new().with_value(ShardingValue::in_list("t_order", "order_id", [2, 4]));
    assert_eq!(targets(&router, context), vec![pair("ds0", "t_order_0")]);

    // database and table shortlists are independent, so [2, 3] reaches all four nodes
    let mut session = Session::new();
    let context = ShardingContext::new().with_value(ShardingValue::in_list("t_order", "order_id", [2, 3]));
    let route = router
        .route(&StatementContext::read(context), &mut session, None)
        .unwrap();
    assert!(!route.full_route);
    assert_eq!(route.units.iter().map(|u| u.table_units.len()).sum::<usize>(), 4);
}

#[test]
fn test_binding_join_stays_single_shard() {
    let router = router_for(RULES);
    let context = ShardingContext::new()
        .with_value(ShardingValue::equal("t_order", "order_id", 3))
        .with_table("t_order_item");
    assert_eq!(
        targets(&router, context),
        vec![pair("ds1", "t_order_1"), pair("ds1", "t_order_item_1")]
    );
}

#[test]
fn test_broadcast_with_sharded_table() {
    let router = router_for(RULES);
    let context = ShardingContext::new()
        .with_value(ShardingValue::equal("t_order", "order_id", 2))
        .with_table("t_config");
    assert_eq!(
        targets(&router, context),
        vec![pair("ds0", "t_config"), pair("ds0", "t_order_0"), pair("ds1", "t_config")]
    );
}

#[test]
fn test_inline_database_strategy() {
    let router = router_for(RULES);
    let context = ShardingContext::new().with_value(ShardingValue::equal("t_user", "USER_ID", 5));
    assert_eq!(targets(&router, context), vec![pair("ds1", "t_user")]);
}

#[test]
fn test_hint_routes_table() {
    let router = router_for(RULES);
    let mut session = Session::new();
    let statement = StatementContext::write(ShardingContext::new().with_table("t_log"));

    let mut hint = HintContext::new();
    hint.add_table_value("t_log", 6);
    let route = router.route(&statement, &mut session, Some(hint)).unwrap();
    assert!(!route.full_route);
    assert_eq!(route.units[0].table_units[0].actual_table, "t_log_2");
    assert_eq!(route.units[0].role, ReplicaRole::Direct);

    // the hint was consumed by the previous call
    let route = router.route(&statement, &mut session, None).unwrap();
    assert!(route.full_route);
    assert_eq!(route.units[0].table_units.len(), 4);
}

#[test]
fn test_unmanaged_table_rejected() {
    let router = router_for(RULES);
    let mut session = Session::new();
    let err = router
        .route(
            &StatementContext::read(ShardingContext::new().with_table("t_missing")),
            &mut session,
            None,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::UnmanagedTable(ref table)) if table == "t_missing"
    ));
}

#[test]
fn test_unmanaged_table_with_default_data_source() {
    let rules = format!("default_data_source = \"ds0\"\n{}", RULES);
    let router = router_for(&rules);
    let context = ShardingContext::new().with_table("t_missing");
    assert_eq!(targets(&router, context), vec![pair("ds0", "t_missing")]);
}

#[test]
fn test_routing_is_idempotent() {
    let router = router_for(RULES);
    let context = ShardingContext::new()
        .with_value(ShardingValue::between("t_order", "order_id", 1, 2))
        .with_table("t_order_item")
        .with_table("t_config");
    assert_eq!(targets(&router, context.clone()), targets(&router, context));
}

#[test]
fn test_binding_mismatch_rejected_at_load() {
    let rules = r#"
binding_tables = [["a", "b"]]

[[tables]]
logic_table = "a"
actual_data_nodes = "ds${0..1}.a_${0..1}"

[[tables]]
logic_table = "b"
actual_data_nodes = "ds${0..1}.b"
"#;
    let config = RoutingConfig::from_toml_str(rules).unwrap();
    let err = RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins()).unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::BindingMismatch { .. })
    ));
}
