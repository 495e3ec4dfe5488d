//! Error types for master/slave routing

use thiserror::Error;

/// Result type for replica operations
pub type Result<T> = std::result::Result<T, ReplicaError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicaError {
    /// Logical datasource declared without a master
    #[error("Master-slave rule '{0}' has no master datasource")]
    NoMaster(String),

    /// Two rules share a logical datasource name
    #[error("Master-slave rule '{0}' is declared more than once")]
    DuplicateRule(String),

    /// Load-balance tag that names no known algorithm
    #[error("Unknown load-balance algorithm '{0}'")]
    InvalidLoadBalance(String),

    /// Commit or rollback issued with no open transaction
    #[error("Cannot {operation}: {reason}")]
    TransactionState {
        operation: &'static str,
        reason: String,
    },
}

impl ReplicaError {
    /// Create a transaction-state error
    pub fn transaction(operation: &'static str, reason: impl Into<String>) -> Self {
        ReplicaError::TransactionState {
            operation,
            reason: reason.into(),
        }
    }

    /// Whether the error comes from configuration rather than a session
    pub fn is_configuration(&self) -> bool {
        !matches!(self, ReplicaError::TransactionState { .. })
    }
}
