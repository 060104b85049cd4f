//! Filter expression language
//!
//! Query text such as `cat:Dining date:2024-03 OR "coffee beans"` is tokenized,
//! parsed into a [`FilterNode`] tree, reclassified for the metadata fallback
//! and then evaluated against transactions.
//!
//! Two entry points:
//! - [`parse`] never fails. Malformed input becomes a single free-text leaf so
//!   live search keeps returning something.
//! - [`parse_strict`] returns the [`FilterError`]. Used wherever an expression
//!   is bound to a rule or spending target.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{
    reclassify, Comparison, DatePrecision, DateSpan, Field, FieldPredicate, FieldValue,
    FilterNode, TextScope,
};
pub use eval::{and_filters, evaluate, or_filters};

use thiserror::Error;
use tracing::debug;

use lexer::Lexer;
use parser::Parser;

/// Why an expression failed strict parsing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("missing value for field '{0}'")]
    EmptyValue(String),

    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("empty group '()'")]
    EmptyGroup,

    #[error("OR needs an expression on both sides")]
    DanglingOr,

    #[error("invalid date '{0}' (expected YYYY, YYYY-MM or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("range '{0}' has its low bound after its high bound")]
    InvertedRange(String),

    #[error("operator '{op}' is not supported on field '{field}'")]
    UnsupportedOperator { field: String, op: String },

    #[error("filter expression is empty")]
    EmptyExpression,
}

/// Strictly parse `text`. Empty or all-whitespace input is `Ok(None)`.
pub fn parse_strict(text: &str) -> Result<Option<FilterNode>, FilterError> {
    let tokens = Lexer::new(text).tokenize()?;
    let tree = Parser::new(tokens).parse()?;
    Ok(tree.map(reclassify))
}

/// Parse `text`, degrading any error to one free-text leaf holding the
/// trimmed input.
pub fn parse(text: &str) -> Option<FilterNode> {
    match parse_strict(text) {
        Ok(tree) => tree,
        Err(e) => {
            debug!("Filter '{}' fell back to free text: {}", text, e);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(reclassify(FilterNode::text(trimmed)))
            }
        }
    }
}

/// Strictly parse an expression bound to a rule or target. Unlike
/// [`parse_strict`], an empty expression is an error here since it would
/// otherwise select every transaction.
pub fn parse_bound(expression: &str) -> Result<FilterNode, FilterError> {
    parse_strict(expression)?.ok_or(FilterError::EmptyExpression)
}
