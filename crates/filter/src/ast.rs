//! Filter expression tree and its evaluation
//!
//! A parsed filter is an immutable tree. Evaluation is a pure recursive
//! walk against one document's metadata: a comparison whose key is absent
//! is false, and AND/OR short-circuit.

use std::cmp::Ordering;
use std::fmt;

use vectormap_core::{Metadata, MetadataValue};

/// Comparison operator of a `key OP literal` predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl ComparisonOp {
    /// Operator as written in filter text
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
        }
    }

    /// Whether the operator orders values rather than testing equality
    pub fn is_ordering(&self) -> bool {
        !matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }

    fn test(&self, actual: &MetadataValue, expected: &MetadataValue) -> bool {
        match self {
            ComparisonOp::Eq => actual == expected,
            ComparisonOp::Ne => actual != expected,
            ComparisonOp::Gt => actual.compare(expected) == Some(Ordering::Greater),
            ComparisonOp::Ge => matches!(
                actual.compare(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ComparisonOp::Lt => actual.compare(expected) == Some(Ordering::Less),
            ComparisonOp::Le => matches!(
                actual.compare(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// `key OP literal`
    Compare {
        /// Metadata key
        key: String,
        /// Operator
        op: ComparisonOp,
        /// Right-hand literal
        value: MetadataValue,
    },
    /// `key IN (..)` or, when `negated`, `key NIN (..)`
    In {
        /// Metadata key
        key: String,
        /// Candidate literals
        values: Vec<MetadataValue>,
        /// `NIN` / `NOT IN`
        negated: bool,
    },
    /// Conjunction
    And(Box<FilterExpression>, Box<FilterExpression>),
    /// Disjunction
    Or(Box<FilterExpression>, Box<FilterExpression>),
    /// Negation
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    /// Build `key == value`
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::compare(key, ComparisonOp::Eq, value)
    }

    /// Build `key OP value`
    pub fn compare(key: impl Into<String>, op: ComparisonOp, value: impl Into<MetadataValue>) -> Self {
        FilterExpression::Compare {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    /// Build `self AND other`
    pub fn and(self, other: FilterExpression) -> Self {
        FilterExpression::And(Box::new(self), Box::new(other))
    }

    /// Build `self OR other`
    pub fn or(self, other: FilterExpression) -> Self {
        FilterExpression::Or(Box::new(self), Box::new(other))
    }

    /// Build `NOT self`
    pub fn negate(self) -> Self {
        FilterExpression::Not(Box::new(self))
    }

    /// Evaluate against one document's metadata
    pub fn evaluate(&self, metadata: &Metadata) -> bool {
        match self {
            FilterExpression::Compare { key, op, value } => metadata
                .get(key)
                .is_some_and(|actual| op.test(actual, value)),
            FilterExpression::In {
                key,
                values,
                negated,
            } => match metadata.get(key) {
                Some(actual) => values.iter().any(|v| actual == v) != *negated,
                None => false,
            },
            FilterExpression::And(left, right) => left.evaluate(metadata) && right.evaluate(metadata),
            FilterExpression::Or(left, right) => left.evaluate(metadata) || right.evaluate(metadata),
            FilterExpression::Not(inner) => !inner.evaluate(metadata),
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    key.split('.').all(|segment| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && chars.all(|c| c.is_alphanumeric() || c == '_')
    })
}

struct KeyDisplay<'a>(&'a str);

impl fmt::Display for KeyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_plain_key(self.0) {
            f.write_str(self.0)
        } else {
            write!(f, "'{}'", self.0.replace('\'', "\\'"))
        }
    }
}

/// Canonical text form; parsing it yields an equal expression
impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Compare { key, op, value } => {
                write!(f, "{} {} {}", KeyDisplay(key), op.symbol(), value)
            }
            FilterExpression::In {
                key,
                values,
                negated,
            } => {
                let keyword = if *negated { "NIN" } else { "IN" };
                write!(f, "{} {} (", KeyDisplay(key), keyword)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str(")")
            }
            FilterExpression::And(l, r) => write!(f, "({} && {})", l, r),
            FilterExpression::Or(l, r) => write!(f, "({} || {})", l, r),
            FilterExpression::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}
