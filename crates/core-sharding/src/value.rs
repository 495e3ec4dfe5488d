//! Sharding values extracted from statement predicates
//!
//! The SQL-extraction layer hands the engine one [`ShardingValue`] per
//! usable predicate. Anything it could not understand is simply absent,
//! which the strategies treat as "no usable value" and answer with a full
//! route.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A scalar literal taken from a predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

impl Literal {
    /// Integer view of the literal.
    ///
    /// Text that parses as an integer counts, since bound parameters often
    /// arrive as strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Integer(v) => Some(*v),
            Literal::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Parse command-line or config input, preferring integers
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(v) => Literal::Integer(v),
            Err(_) => Literal::Text(trimmed.to_string()),
        }
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a.cmp(b),
            (Literal::Text(a), Literal::Text(b)) => a.cmp(b),
            (Literal::Integer(_), Literal::Text(_)) => Ordering::Less,
            (Literal::Text(_), Literal::Integer(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Integer(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Integer(v as i64)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

/// Predicate operator a value was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShardingOperator {
    /// `column = v`
    Equal,
    /// `column IN (v1, v2, ...)`
    In,
    /// `column BETWEEN lo AND hi`
    Between,
}

/// Values of one sharding column for one logical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingValue {
    /// Logical table the predicate belongs to
    pub logic_table: String,
    /// Column name as written in the statement
    pub column: String,
    pub operator: ShardingOperator,
    /// Literals in statement order
    pub values: Vec<Literal>,
}

impl ShardingValue {
    /// `column = value`
    pub fn equal(
        logic_table: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<Literal>,
    ) -> Self {
        Self {
            logic_table: logic_table.into(),
            column: column.into(),
            operator: ShardingOperator::Equal,
            values: vec![value.into()],
        }
    }

    /// `column IN (values...)`
    pub fn in_list<I, V>(logic_table: impl Into<String>, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Self {
            logic_table: logic_table.into(),
            column: column.into(),
            operator: ShardingOperator::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column BETWEEN lower AND upper`
    pub fn between(
        logic_table: impl Into<String>,
        column: impl Into<String>,
        lower: impl Into<Literal>,
        upper: impl Into<Literal>,
    ) -> Self {
        Self {
            logic_table: logic_table.into(),
            column: column.into(),
            operator: ShardingOperator::Between,
            values: vec![lower.into(), upper.into()],
        }
    }

    /// Column match, ignoring ASCII case
    pub fn is_column(&self, column: &str) -> bool {
        self.column.eq_ignore_ascii_case(column)
    }

    /// Table match, ignoring ASCII case
    pub fn is_table(&self, table: &str) -> bool {
        self.logic_table.eq_ignore_ascii_case(table)
    }

    /// Whether the literal count fits the operator.
    ///
    /// Ill-formed values are treated like a predicate the extractor could
    /// not use at all.
    pub fn is_usable(&self) -> bool {
        match self.operator {
            ShardingOperator::Equal => self.values.len() == 1,
            ShardingOperator::In => !self.values.is_empty(),
            ShardingOperator::Between => self.values.len() == 2,
        }
    }

    /// Inclusive bounds of a `BETWEEN` value
    pub fn bounds(&self) -> Option<(&Literal, &Literal)> {
        match (self.operator, self.values.as_slice()) {
            (ShardingOperator::Between, [lower, upper]) => Some((lower, upper)),
            _ => None,
        }
    }
}
