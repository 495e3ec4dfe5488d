//! Error types for rule loading and routing

use thiserror::Error;

/// Result type for sharding operations
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Fatal configuration problems.
///
/// Routing itself is total over a valid rule set, so these are the only
/// failures it can surface. They are raised while a rule set is built, or on
/// the first statement that references a table no rule covers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Table has no sharding rule, is not broadcast, and no default datasource exists
    #[error("Table '{0}' is not managed by any sharding rule and no default datasource is configured")]
    UnmanagedTable(String),

    /// Inline or node expression could not be parsed
    #[error("Malformed expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// Expanded node is not of the form `datasource.table`
    #[error("Invalid data node '{0}': expected <datasource>.<table>")]
    InvalidDataNode(String),

    /// A sharding rule expanded to zero nodes
    #[error("Table '{0}' has no actual data nodes")]
    EmptyDataNodes(String),

    /// Binding group members do not shard identically
    #[error("Binding group [{group}] is invalid: {reason}")]
    BindingMismatch { group: String, reason: String },

    /// Binding group references a table without a sharding rule
    #[error("Binding table '{0}' has no sharding rule")]
    UnknownBindingTable(String),

    /// Same logical table configured twice
    #[error("Table '{0}' is configured more than once")]
    DuplicateTable(String),

    /// Strategy references an algorithm name nobody registered
    #[error("Unknown {kind} sharding algorithm '{name}'")]
    UnknownAlgorithm { kind: &'static str, name: String },

    /// Strategy definition is internally inconsistent
    #[error("Invalid sharding strategy: {0}")]
    InvalidStrategy(String),

    /// Rule set knows no datasource at all
    #[error("No datasource is configured")]
    NoDataSource,
}

impl ConfigurationError {
    /// Create a malformed expression error
    pub fn malformed<E: Into<String>, R: Into<String>>(expression: E, reason: R) -> Self {
        ConfigurationError::MalformedExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create a binding mismatch error for the given group members
    pub fn binding_mismatch<R: Into<String>>(group: &[String], reason: R) -> Self {
        ConfigurationError::BindingMismatch {
            group: group.join(", "),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmanaged_table_message() {
        let err = ConfigurationError::UnmanagedTable("t_user".to_string());
        assert!(err.to_string().contains("t_user"));
        assert!(err.to_string().contains("no default datasource"));
    }

    #[test]
    fn test_malformed_helper() {
        let err = ConfigurationError::malformed("ds${0..", "unclosed group");
        assert!(matches!(err, ConfigurationError::MalformedExpression { .. }));
        assert_eq!(
            err.to_string(),
            "Malformed expression 'ds${0..': unclosed group"
        );
    }

    #[test]
    fn test_binding_mismatch_lists_group() {
        let group = vec!["t_order".to_string(), "t_order_item".to_string()];
        let err = ConfigurationError::binding_mismatch(&group, "cardinality 4 vs 2");
        let msg = err.to_string();
        assert!(msg.contains("t_order, t_order_item"));
        assert!(msg.contains("cardinality 4 vs 2"));
    }
}
