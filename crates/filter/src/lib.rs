//! Metadata filter language for vectormap
//!
//! This crate turns filter text such as
//! `country == 'BG' && year >= 2020` into a [`FilterExpression`] and
//! evaluates it against document metadata:
//! - Lexer: positioned tokens, case-insensitive keywords
//! - Parser: recursive descent, `AND` binds tighter than `OR`
//! - Cache: text -> parse result memoization shared across searches
//!
//! Errors carry a line/column position and render as
//! `Line: <line>:<column>, Error: <message>`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod cache;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{ComparisonOp, FilterExpression};
pub use cache::{FilterCache, DEFAULT_FILTER_CACHE_CAPACITY};
pub use error::{FilterParseError, FilterResult};
pub use parser::parse;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use vectormap_core::{Metadata, MetadataValue};

    fn arb_value() -> impl Strategy<Value = MetadataValue> {
        prop_oneof![
            "[a-c]{1,2}".prop_map(MetadataValue::String),
            (-3i64..3).prop_map(MetadataValue::Integer),
            any::<bool>().prop_map(MetadataValue::Bool),
        ]
    }

    fn arb_leaf() -> impl Strategy<Value = FilterExpression> {
        let key = prop_oneof![Just("x"), Just("y"), Just("z")];
        let op = prop_oneof![
            Just(ComparisonOp::Eq),
            Just(ComparisonOp::Ne),
            Just(ComparisonOp::Gt),
            Just(ComparisonOp::Le),
        ];
        (key, op, arb_value()).prop_map(|(k, op, v)| {
            // ordering against a bool literal does not parse
            let op = if matches!(v, MetadataValue::Bool(_)) && op.is_ordering() {
                ComparisonOp::Eq
            } else {
                op
            };
            FilterExpression::compare(k, op, v)
        })
    }

    fn arb_expr() -> impl Strategy<Value = FilterExpression> {
        arb_leaf().prop_recursive(4, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.or(r)),
                inner.prop_map(FilterExpression::negate),
            ]
        })
    }

    fn arb_metadata() -> impl Strategy<Value = Metadata> {
        proptest::collection::btree_map(
            prop_oneof![Just("x".to_string()), Just("y".to_string()), Just("z".to_string())],
            arb_value(),
            0..3,
        )
    }

    proptest! {
        #[test]
        fn negation_inverts(expr in arb_expr(), meta in arb_metadata()) {
            prop_assert_eq!(expr.clone().negate().evaluate(&meta), !expr.evaluate(&meta));
        }

        #[test]
        fn display_reparses(expr in arb_expr()) {
            let reparsed = parse(&expr.to_string()).unwrap();
            prop_assert_eq!(reparsed, expr);
        }
    }
}
