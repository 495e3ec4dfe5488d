/*!
 * Error types for Shardgate
 */

use shardgate_core_replica::ReplicaError;
use shardgate_core_sharding::ConfigurationError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 2;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid sharding rules, or a statement touching an unmanaged table
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Invalid master/slave rules, or a misplaced commit/rollback
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// Configuration file is not valid TOML for this schema
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Coordination collaborator failure (lock lost, watch closed)
    #[error("Coordination error: {0}")]
    Coordination(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    /// Whether the error invalidates a configuration, as opposed to a
    /// single session or the environment
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_) | Error::Toml(_) => true,
            Error::Replica(e) => e.is_configuration(),
            Error::Io(_) | Error::Coordination(_) | Error::Logging(_) => false,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        EXIT_FATAL
    }
}
