//! Actual data nodes: concrete (datasource, table) pairs

use crate::error::{ConfigurationError, Result};
use crate::expression;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One physical table on one datasource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source: String,
    pub table: String,
}

impl DataNode {
    pub fn new(data_source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            table: table.into(),
        }
    }

    /// Parse `datasource.table`, splitting on the first dot
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text.split_once('.') {
            Some((ds, table)) if !ds.trim().is_empty() && !table.trim().is_empty() => {
                Ok(Self::new(ds.trim(), table.trim()))
            }
            _ => Err(ConfigurationError::InvalidDataNode(text.to_string())),
        }
    }

    /// Expand node notation into an ordered, duplicate-free node list
    pub fn expand(expression: &str) -> Result<Vec<DataNode>> {
        let mut nodes: Vec<DataNode> = Vec::new();
        for text in expression::expand(expression)? {
            let node = Self::parse(&text)?;
            if nodes.iter().any(|n| n.same_as(&node)) {
                return Err(ConfigurationError::malformed(
                    expression,
                    format!("node '{}' appears twice", node),
                ));
            }
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Case-insensitive identity
    pub fn same_as(&self, other: &DataNode) -> bool {
        self.data_source.eq_ignore_ascii_case(&other.data_source)
            && self.table.eq_ignore_ascii_case(&other.table)
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.data_source, self.table)
    }
}
