/*!
 * Shardgate CLI - validate rule files and preview statement routing
 */

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use shardgate::{
    error::{Error, EXIT_FATAL, EXIT_SUCCESS},
    logging,
    replica::Session,
    sharding::{AlgorithmRegistry, HintContext, Literal, ShardingContext, ShardingValue},
    PhysicalRoute, Router, RoutingConfig, RuleSnapshot, SnapshotHolder, StatementContext,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shardgate")]
#[command(version, about = "Sharding and master/slave routing for distributed SQL", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a rule file builds into a valid snapshot
    Validate {
        /// Rule configuration file (TOML)
        #[arg(short = 'c', long = "config", value_name = "FILE")]
        config: PathBuf,
    },

    /// Show where a statement would be routed
    Route(RouteArgs),
}

#[derive(clap::Args)]
struct RouteArgs {
    /// Rule configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: PathBuf,

    /// Logical table referenced by the statement (repeatable)
    #[arg(short = 't', long = "table", value_name = "TABLE")]
    tables: Vec<String>,

    /// Equality predicate: table.column=value
    #[arg(long = "equal", value_name = "TABLE.COLUMN=VALUE")]
    equal: Vec<String>,

    /// IN predicate: table.column=v1,v2,...
    #[arg(long = "in", value_name = "TABLE.COLUMN=V1,V2")]
    in_list: Vec<String>,

    /// BETWEEN predicate: table.column=low..high
    #[arg(long = "between", value_name = "TABLE.COLUMN=LOW..HIGH")]
    between: Vec<String>,

    /// Treat the statement as a write
    #[arg(long = "write")]
    write: bool,

    /// Route inside an open transaction
    #[arg(long = "in-transaction")]
    in_transaction: bool,

    /// Force master datasources for this statement
    #[arg(long = "master-only")]
    master_only: bool,

    /// Print the route as JSON
    #[arg(long = "json")]
    json: bool,
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<Error>().map_or(EXIT_FATAL, Error::exit_code)
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let (config, snapshot) = load(&config, cli.verbose)?;
            let sharding = snapshot.sharding();
            println!(
                "Configuration OK: {} sharded tables, {} broadcast tables, {} binding groups, {} datasources, {} master-slave rules",
                sharding.logic_tables().len(),
                sharding.broadcast_tables().len(),
                sharding.binding_rules().len(),
                sharding.data_source_names().len(),
                snapshot.master_slave().len()
            );
            if let Some(default) = &config.default_data_source {
                println!("Default datasource: {}", default);
            }
            Ok(())
        }
        Commands::Route(args) => route(args, cli.verbose),
    }
}

/// Load, initialise logging from the file's settings, and build the snapshot
fn load(path: &Path, verbose: bool) -> anyhow::Result<(RoutingConfig, RuleSnapshot)> {
    let mut config = RoutingConfig::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config.logging.verbose |= verbose;
    logging::init_logging(&config.logging)?;

    let snapshot = RuleSnapshot::build(&config, &AlgorithmRegistry::with_builtins())?;
    Ok((config, snapshot))
}

fn route(args: RouteArgs, verbose: bool) -> anyhow::Result<()> {
    let (_, snapshot) = load(&args.config, verbose)?;
    let router = Router::new(Arc::new(SnapshotHolder::new(snapshot)));

    let mut context = ShardingContext::new();
    for table in &args.tables {
        context = context.with_table(table.as_str());
    }
    for raw in &args.equal {
        let (table, column, value) = split_predicate(raw)?;
        context = context.with_value(ShardingValue::equal(table, column, Literal::parse(value)));
    }
    for raw in &args.in_list {
        let (table, column, values) = split_predicate(raw)?;
        let values = values.split(',').map(|v| Literal::parse(v.trim()));
        context = context.with_value(ShardingValue::in_list(table, column, values));
    }
    for raw in &args.between {
        let (table, column, range) = split_predicate(raw)?;
        let (low, high) = range
            .split_once("..")
            .ok_or_else(|| anyhow!("BETWEEN predicate '{}' needs LOW..HIGH", raw))?;
        context = context.with_value(ShardingValue::between(
            table,
            column,
            Literal::parse(low.trim()),
            Literal::parse(high.trim()),
        ));
    }

    let statement = if args.write {
        StatementContext::write(context)
    } else {
        StatementContext::read(context)
    };
    let mut session = Session::new();
    if args.in_transaction {
        session.begin()?;
    }
    let hint = args.master_only.then(|| {
        let mut hint = HintContext::new();
        hint.set_master_route_only();
        hint
    });

    let route = router.route(&statement, &mut session, hint)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        print_route(&route);
    }
    Ok(())
}

fn print_route(route: &PhysicalRoute) {
    for unit in &route.units {
        let tables: Vec<String> = unit
            .table_units
            .iter()
            .map(|t| format!("{} -> {}", t.logic_table, t.actual_table))
            .collect();
        println!(
            "{} ({:?}, logical {}): {}",
            unit.data_source,
            unit.role,
            unit.logical_data_source,
            if tables.is_empty() {
                "-".to_string()
            } else {
                tables.join(", ")
            }
        );
    }
    println!("full route: {}", if route.full_route { "yes" } else { "no" });
}

/// Split `table.column=rest`
fn split_predicate(raw: &str) -> anyhow::Result<(&str, &str, &str)> {
    let (target, rest) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("predicate '{}' must look like table.column=value", raw))?;
    let (table, column) = target
        .split_once('.')
        .ok_or_else(|| anyhow!("predicate '{}' must name table.column", raw))?;
    let (table, column, rest) = (table.trim(), column.trim(), rest.trim());
    if table.is_empty() || column.is_empty() || rest.is_empty() {
        bail!("predicate '{}' has an empty table, column or value", raw);
    }
    Ok((table, column, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_split_predicate() {
        assert_eq!(
            split_predicate("t_order.order_id=3").unwrap(),
            ("t_order", "order_id", "3")
        );
        assert_eq!(
            split_predicate(" t_order.order_id = 1,2 ").unwrap(),
            ("t_order", "order_id", "1,2")
        );
        assert!(split_predicate("order_id=3").is_err());
        assert!(split_predicate("t_order.order_id").is_err());
        assert!(split_predicate("t_order.order_id=").is_err());
    }

    #[test]
    fn test_route_args_parse() {
        let cli = Cli::try_parse_from([
            "shardgate",
            "route",
            "--config",
            "rules.toml",
            "--table",
            "t_order_item",
            "--equal",
            "t_order.order_id=3",
            "--between",
            "t_order.user_id=1..4",
            "--write",
            "--json",
        ])
        .unwrap();
        let Commands::Route(args) = cli.command else {
            panic!("expected route command");
        };
        assert_eq!(args.tables, vec!["t_order_item"]);
        assert_eq!(args.equal, vec!["t_order.order_id=3"]);
        assert_eq!(args.between.len(), 1);
        assert!(args.write && args.json && !args.in_transaction);
    }
}
