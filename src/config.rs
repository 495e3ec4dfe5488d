/*!
 * Configuration types for Shardgate
 */

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete routing configuration, one per snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Datasources that may hold no sharded node (broadcast or default targets)
    #[serde(default)]
    pub data_sources: Vec<String>,

    /// Target for unmanaged tables and table-less statements
    #[serde(default)]
    pub default_data_source: Option<String>,

    #[serde(default)]
    pub broadcast_tables: Vec<String>,

    /// Groups of tables that shard identically
    #[serde(default)]
    pub binding_tables: Vec<Vec<String>>,

    /// Applies to tables without their own database strategy
    #[serde(default)]
    pub default_database_strategy: Option<StrategyConfig>,

    /// Applies to tables without their own table strategy
    #[serde(default)]
    pub default_table_strategy: Option<StrategyConfig>,

    #[serde(default)]
    pub tables: Vec<TableConfig>,

    #[serde(default)]
    pub master_slave: Vec<MasterSlaveConfig>,

    #[serde(default)]
    pub logging: LogConfig,
}

/// One sharded logical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub logic_table: String,

    /// Node notation, e.g. `ds${0..1}.t_order_${0..1}`
    pub actual_data_nodes: String,

    #[serde(default)]
    pub database_strategy: Option<StrategyConfig>,

    #[serde(default)]
    pub table_strategy: Option<StrategyConfig>,
}

/// Strategy declaration; algorithm names resolve against an
/// `AlgorithmRegistry` when the snapshot is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    None,
    Standard {
        column: String,
        precise: String,
        #[serde(default)]
        range: Option<String>,
    },
    Complex {
        columns: Vec<String>,
        algorithm: String,
    },
    Hint {
        algorithm: String,
    },
    Inline {
        column: String,
        expression: String,
    },
}

/// One logical datasource with read replicas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSlaveConfig {
    pub name: String,

    /// Missing or blank is rejected when the snapshot is built
    #[serde(default)]
    pub master: String,

    #[serde(default)]
    pub slaves: Vec<String>,

    /// `round_robin` (default) or `random`
    #[serde(default)]
    pub load_balance: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for level = debug)
    #[serde(default)]
    pub verbose: bool,
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Informational messages
    #[default]
    Info,

    /// Per-statement routing decisions
    Debug,

    /// Everything
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl RoutingConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
