//! Inline expressions
//!
//! Two small languages share the `${...}` group syntax (`$->{...}` is
//! accepted too):
//!
//! - **Node notation** expands a compact pattern into an explicit list:
//!   `ds${0..1}.t_order_${0..1}` becomes `ds0.t_order_0`, `ds0.t_order_1`,
//!   `ds1.t_order_0`, `ds1.t_order_1`. Groups hold a range `a..b` or a list
//!   `a, b, c`; several groups multiply out with the leftmost group most
//!   significant, and top-level commas separate independent patterns.
//! - **Sharding expressions** compute a target name from one column value:
//!   `t_order_${order_id % 2}`.

use crate::error::{ConfigurationError, Result};
use crate::value::Literal;

/// Upper bound on the names one node expression may expand to
pub const MAX_EXPANDED_NAMES: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Group(String),
}

/// Split an expression into literal text and `${...}` group bodies
fn segments(expression: &str) -> Result<Vec<Segment>> {
    let mut result = Vec::new();
    let mut text = String::new();
    let mut rest = expression;

    while !rest.is_empty() {
        let opener = if rest.starts_with("$->{") {
            4
        } else if rest.starts_with("${") {
            2
        } else {
            0
        };

        if opener == 0 {
            let ch = rest.chars().next().unwrap_or_default();
            if ch == '}' {
                return Err(ConfigurationError::malformed(expression, "unbalanced '}'"));
            }
            text.push(ch);
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        let body_start = &rest[opener..];
        let close = body_start
            .find('}')
            .ok_or_else(|| ConfigurationError::malformed(expression, "unclosed '${' group"))?;
        let body = &body_start[..close];
        if body.contains('{') {
            return Err(ConfigurationError::malformed(expression, "nested groups are not supported"));
        }
        if body.trim().is_empty() {
            return Err(ConfigurationError::malformed(expression, "empty group"));
        }
        if !text.is_empty() {
            result.push(Segment::Text(std::mem::take(&mut text)));
        }
        result.push(Segment::Group(body.trim().to_string()));
        rest = &body_start[close + 1..];
    }

    if !text.is_empty() {
        result.push(Segment::Text(text));
    }
    Ok(result)
}

/// Split on commas that sit outside any group
fn split_top_level(expression: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in expression.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&expression[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&expression[start..]);
    parts
}

/// Values produced by one node-notation group
fn group_values(expression: &str, body: &str) -> Result<Vec<String>> {
    if let Some((lower, upper)) = body.split_once("..") {
        let (lower, upper) = (lower.trim(), upper.trim());
        let lo: u64 = lower
            .parse()
            .map_err(|_| ConfigurationError::malformed(expression, format!("invalid range start '{}'", lower)))?;
        let hi: u64 = upper
            .parse()
            .map_err(|_| ConfigurationError::malformed(expression, format!("invalid range end '{}'", upper)))?;
        if lo > hi {
            return Err(ConfigurationError::malformed(
                expression,
                format!("descending range {}..{}", lo, hi),
            ));
        }
        if hi - lo >= MAX_EXPANDED_NAMES as u64 {
            return Err(ConfigurationError::malformed(
                expression,
                format!("range {}..{} expands past {} names", lo, hi, MAX_EXPANDED_NAMES),
            ));
        }
        // `${00..15}` keeps the padding of its lower bound
        let width = if lower.len() > 1 && lower.starts_with('0') {
            lower.len()
        } else {
            0
        };
        return Ok((lo..=hi).map(|i| format!("{:0width$}", i, width = width)).collect());
    }

    let items: Vec<String> = body.split(',').map(|s| s.trim().to_string()).collect();
    if items.iter().any(|s| s.is_empty()) {
        return Err(ConfigurationError::malformed(expression, "empty list item"));
    }
    Ok(items)
}

/// Expand node notation into an ordered list of names
pub fn expand(expression: &str) -> Result<Vec<String>> {
    if expression.trim().is_empty() {
        return Err(ConfigurationError::malformed(expression, "empty expression"));
    }

    let mut result = Vec::new();
    for part in split_top_level(expression) {
        let part = part.trim();
        if part.is_empty() {
            return Err(ConfigurationError::malformed(expression, "empty item between commas"));
        }
        let mut expanded = vec![String::new()];
        for segment in segments(part)? {
            let values = match segment {
                Segment::Text(text) => vec![text],
                Segment::Group(body) => group_values(expression, &body)?,
            };
            if (result.len() + expanded.len()).saturating_mul(values.len()) > MAX_EXPANDED_NAMES {
                return Err(ConfigurationError::malformed(
                    expression,
                    format!("expands past {} names", MAX_EXPANDED_NAMES),
                ));
            }
            expanded = expanded
                .iter()
                .flat_map(|prefix| values.iter().map(move |v| format!("{}{}", prefix, v)))
                .collect();
        }
        result.extend(expanded);
    }
    Ok(result)
}

/// Integer operator in a sharding expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Op {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Op::Add),
            '-' => Some(Op::Sub),
            '*' => Some(Op::Mul),
            '/' => Some(Op::Div),
            '%' => Some(Op::Rem),
            _ => None,
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            Op::Add => lhs.checked_add(rhs),
            Op::Sub => lhs.checked_sub(rhs),
            Op::Mul => lhs.checked_mul(rhs),
            Op::Div => lhs.checked_div_euclid(rhs),
            Op::Rem => lhs.checked_rem_euclid(rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Eval { column: String, ops: Vec<(Op, i64)> },
}

/// Compiled sharding expression such as `ds${user_id % 2}`.
///
/// Operators apply strictly left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineExpression {
    source: String,
    parts: Vec<Part>,
}

impl InlineExpression {
    /// Compile an expression, rejecting anything outside the grammar
    pub fn parse(expression: &str) -> Result<Self> {
        let mut parts = Vec::new();
        for segment in segments(expression)? {
            match segment {
                Segment::Text(text) => parts.push(Part::Text(text)),
                Segment::Group(body) => parts.push(Self::parse_group(expression, &body)?),
            }
        }
        if !parts.iter().any(|p| matches!(p, Part::Eval { .. })) {
            return Err(ConfigurationError::malformed(expression, "expression references no column"));
        }
        Ok(Self {
            source: expression.to_string(),
            parts,
        })
    }

    fn parse_group(expression: &str, body: &str) -> Result<Part> {
        let mut chars = body.chars().peekable();
        let mut column = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                column.push(ch);
                chars.next();
            } else {
                break;
            }
        }
        if column.is_empty() || column.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ConfigurationError::malformed(expression, format!("'{}' does not start with a column", body)));
        }

        let mut ops = Vec::new();
        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            let Some(ch) = chars.next() else { break };
            let op = Op::from_char(ch)
                .ok_or_else(|| ConfigurationError::malformed(expression, format!("unexpected '{}'", ch)))?;
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            let mut digits = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let operand: i64 = digits
                .parse()
                .map_err(|_| ConfigurationError::malformed(expression, "operator needs an integer operand"))?;
            if operand == 0 && matches!(op, Op::Div | Op::Rem) {
                return Err(ConfigurationError::malformed(expression, "division by zero"));
            }
            ops.push((op, operand));
        }
        Ok(Part::Eval { column, ops })
    }

    /// Columns referenced by the expression, in order of appearance
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for part in &self.parts {
            if let Part::Eval { column, .. } = part {
                if !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                    columns.push(column);
                }
            }
        }
        columns
    }

    /// Evaluate against one literal.
    ///
    /// `None` when arithmetic is required but the literal is not an integer
    /// or the arithmetic overflows.
    pub fn evaluate(&self, value: &Literal) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Eval { ops, .. } if ops.is_empty() => out.push_str(&value.to_string()),
                Part::Eval { ops, .. } => {
                    let mut acc = value.as_i64()?;
                    for (op, operand) in ops {
                        acc = op.apply(acc, *operand)?;
                    }
                    out.push_str(&acc.to_string());
                }
            }
        }
        Some(out)
    }

    /// The expression as written
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_cartesian_ascending() {
        let nodes = expand("ds${0..1}.t_${0..1}").unwrap();
        assert_eq!(nodes, vec!["ds0.t_0", "ds0.t_1", "ds1.t_0", "ds1.t_1"]);
    }

    #[test]
    fn test_expand_list_and_top_level_commas() {
        let nodes = expand("ds0.t_${a, b}").unwrap();
        assert_eq!(nodes, vec!["ds0.t_a", "ds0.t_b"]);

        let nodes = expand("ds${0, 2}.t_user, ds9.t_user").unwrap();
        assert_eq!(nodes, vec!["ds0.t_user", "ds2.t_user", "ds9.t_user"]);
    }

    #[test]
    fn test_expand_keeps_zero_padding() {
        let nodes = expand("t_${00..11}").unwrap();
        assert_eq!(nodes.len(), 12);
        assert_eq!(nodes[0], "t_00");
        assert_eq!(nodes[11], "t_11");
    }

    #[test]
    fn test_expand_arrow_opener() {
        assert_eq!(expand("ds$->{0..2}").unwrap(), vec!["ds0", "ds1", "ds2"]);
    }

    #[test]
    fn test_expand_rejects_malformed() {
        for bad in ["", "ds${0..1", "ds${}", "ds${3..1}", "ds${a..b}", "ds0}", "ds0,,ds1"] {
            assert!(expand(bad).is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn test_expand_rejects_oversized() {
        let err = expand("ds${0..4000000000}").unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedExpression { .. }));
        assert!(expand("ds${0..999}.t_${0..999}").is_err());
        assert_eq!(expand("t_${0..65535}").unwrap().len(), MAX_EXPANDED_NAMES);
    }

    #[test]
    fn test_inline_modulo() {
        let expr = InlineExpression::parse("t_order_${order_id % 2}").unwrap();
        assert_eq!(expr.columns(), vec!["order_id"]);
        assert_eq!(expr.evaluate(&Literal::Integer(3)).unwrap(), "t_order_1");
        assert_eq!(expr.evaluate(&Literal::Integer(-3)).unwrap(), "t_order_1");
        assert_eq!(expr.evaluate(&Literal::from("10")).unwrap(), "t_order_0");
        assert!(expr.evaluate(&Literal::from("abc")).is_none());
    }

    #[test]
    fn test_inline_left_to_right() {
        let expr = InlineExpression::parse("ds$->{user_id / 10 % 4}").unwrap();
        assert_eq!(expr.evaluate(&Literal::Integer(57)).unwrap(), "ds1");
    }

    #[test]
    fn test_inline_plain_substitution() {
        let expr = InlineExpression::parse("t_log_${region}").unwrap();
        assert_eq!(expr.evaluate(&Literal::from("eu")).unwrap(), "t_log_eu");
    }

    #[test]
    fn test_inline_rejects_bad_grammar() {
        assert!(InlineExpression::parse("t_order").is_err());
        assert!(InlineExpression::parse("t_${order_id % 0}").is_err());
        assert!(InlineExpression::parse("t_${order_id ^ 2}").is_err());
        assert!(InlineExpression::parse("t_${2 % order_id}").is_err());
        assert!(InlineExpression::parse("t_${order_id %}").is_err());
    }
}
