//! Integration tests for configuration reload through the coordinator

use shardgate::coordination::{config_path, publish_config, LockNode};
use shardgate::replica::Session;
use shardgate::sharding::{AlgorithmRegistry, ShardingContext, ShardingValue};
use shardgate::{
    Coordinator, MemoryCoordinator, ReloadListener, Router, RoutingConfig, RuleSnapshot,
    SnapshotHolder, StatementContext,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const TWO_TABLES: &str = r#"
[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds0.t_order_${0..1}"
table_strategy = { type = "standard", column = "order_id", precise = "modulo" }
"#;

const FOUR_TABLES: &str = r#"
[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds0.t_order_${0..3}"
table_strategy = { type = "standard", column = "order_id", precise = "modulo" }
"#;

fn holder(rules: &str) -> Arc<SnapshotHolder> {
    let config = RoutingConfig::from_toml_str(rules).unwrap();
    let snapshot = RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins()).unwrap();
    Arc::new(SnapshotHolder::new(snapshot))
}

fn actual_table(router: &Router, order_id: i64) -> String {
    let context = ShardingContext::new().with_value(ShardingValue::equal("t_order", "order_id", order_id));
    let route = router
        .route(&StatementContext::read(context), &mut Session::new(), None)
        .unwrap();
    route.units[0].table_units[0].actual_table.clone()
}

async fn wait_for_version(holder: &SnapshotHolder, version: u64) {
    for _ in 0..100 {
        if holder.version() >= version {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("snapshot version {} never published", version);
}

#[tokio::test]
async fn test_reload_swaps_snapshot() {
    let coordinator = Arc::new(MemoryCoordinator::new());
    let holder = holder(TWO_TABLES);
    let router = Router::new(Arc::clone(&holder));
    assert_eq!(actual_table(&router, 3), "t_order_1");

    let listener = ReloadListener::new(
        coordinator.clone(),
        Arc::clone(&holder),
        Arc::new(AlgorithmRegistry::with_builtins()),
        "sharding_db",
        "instance-1",
    );
    let task = listener.start().await.unwrap();

    publish_config(coordinator.as_ref(), "sharding_db", FOUR_TABLES, Duration::from_secs(1))
        .await
        .unwrap();
    wait_for_version(&holder, 2).await;

    assert_eq!(actual_table(&router, 3), "t_order_3");
    let ack = LockNode::ack_path("instance-1");
    for _ in 0..100 {
        if coordinator.get(&ack).is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(coordinator.get(&ack).as_deref(), Some("2"));
    task.abort();
}

#[tokio::test]
async fn test_invalid_reload_keeps_old_snapshot() {
    let coordinator = Arc::new(MemoryCoordinator::new());
    let holder = holder(TWO_TABLES);
    let router = Router::new(Arc::clone(&holder));

    let listener = ReloadListener::new(
        coordinator.clone(),
        Arc::clone(&holder),
        Arc::new(AlgorithmRegistry::with_builtins()),
        "sharding_db",
        "instance-1",
    );
    let task = listener.start().await.unwrap();

    let broken = r#"
[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds0.t_order_${0..3"
"#;
    coordinator.put(&config_path("sharding_db"), broken).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(holder.version(), 1, "broken configuration must not publish");
    assert_eq!(actual_table(&router, 3), "t_order_1");

    coordinator
        .put(&config_path("sharding_db"), FOUR_TABLES)
        .await
        .unwrap();
    wait_for_version(&holder, 2).await;
    assert_eq!(actual_table(&router, 3), "t_order_3");
    task.abort();
}

#[tokio::test]
async fn test_apply_rejects_invalid_config() {
    let coordinator = Arc::new(MemoryCoordinator::new());
    let holder = holder(TWO_TABLES);
    let listener = ReloadListener::new(
        coordinator,
        Arc::clone(&holder),
        Arc::new(AlgorithmRegistry::with_builtins()),
        "sharding_db",
        "instance-1",
    );

    let err = listener
        .apply("[[master_slave]]\nname = \"ds0\"\n")
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(holder.version(), 1);
    assert_eq!(listener.apply(FOUR_TABLES).unwrap(), 2);
}

#[test]
fn test_config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FOUR_TABLES.as_bytes()).unwrap();

    let config = RoutingConfig::from_file(file.path()).unwrap();
    let snapshot = RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins()).unwrap();
    assert_eq!(
        snapshot.sharding().rule("t_order").unwrap().actual_data_nodes().len(),
        4
    );
}
