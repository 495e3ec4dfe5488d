use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use shardgate::replica::Session;
use shardgate::sharding::{
    AlgorithmRegistry, RoutingEngine, ShardingContext, ShardingValue,
};
use shardgate::{Router, RoutingConfig, RuleSnapshot, SnapshotHolder, StatementContext};
use std::hint::black_box;
use std::sync::Arc;

/// Rule set with `shards` datasources of `shards` tables each
fn snapshot(shards: usize) -> RuleSnapshot {
    let last = shards - 1;
    let rules = format!(
        r#"
broadcast_tables = ["t_config"]
binding_tables = [["t_order", "t_order_item"]]

[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds${{0..{last}}}.t_order_${{0..{last}}}"
database_strategy = {{ type = "standard", column = "user_id", precise = "modulo", range = "modulo" }}
table_strategy = {{ type = "inline", column = "order_id", expression = "t_order_${{order_id % {shards}}}" }}

[[tables]]
logic_table = "t_order_item"
actual_data_nodes = "ds${{0..{last}}}.t_order_item_${{0..{last}}}"

[[master_slave]]
name = "ds0"
master = "ds0_master"
slaves = ["ds0_slave0", "ds0_slave1"]
"#
    );
    let config = RoutingConfig::from_toml_str(&rules).unwrap();
    RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins()).unwrap()
}

/// Precise, range and full-route statements against growing node counts
fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing_engine");

    for shards in [2usize, 8, 32] {
        let snapshot = snapshot(shards);
        let engine = RoutingEngine::new(snapshot.sharding());

        let precise = ShardingContext::new()
            .with_value(ShardingValue::equal("t_order", "user_id", 7))
            .with_value(ShardingValue::equal("t_order", "order_id", 11))
            .with_table("t_order_item");
        let range = ShardingContext::new()
            .with_value(ShardingValue::between("t_order", "user_id", 1, 3))
            .with_table("t_config");
        let full = ShardingContext::new().with_table("t_order");

        group.bench_with_input(BenchmarkId::new("precise_binding", shards), &precise, |b, ctx| {
            b.iter(|| engine.route(black_box(ctx), None).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("range_broadcast", shards), &range, |b, ctx| {
            b.iter(|| engine.route(black_box(ctx), None).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("full_route", shards), &full, |b, ctx| {
            b.iter(|| engine.route(black_box(ctx), None).unwrap())
        });
    }

    group.finish();
}

/// Router facade including snapshot load and master/slave resolution
fn bench_router(c: &mut Criterion) {
    let router = Router::new(Arc::new(SnapshotHolder::new(snapshot(8))));
    let statement = StatementContext::read(
        ShardingContext::new()
            .with_value(ShardingValue::equal("t_order", "user_id", 8))
            .with_value(ShardingValue::equal("t_order", "order_id", 3)),
    );

    c.bench_function("router_read", |b| {
        let mut session = Session::new();
        b.iter(|| router.route(black_box(&statement), &mut session, None).unwrap())
    });
}

criterion_group!(benches, bench_engine, bench_router);
criterion_main!(benches);
