//! Error types for the query engine
//!
//! Parse-time errors are detected eagerly and carry the offending fragment;
//! bind-time errors reference the resolved property and class names. Value
//! level null/type mismatches never error; they evaluate to "no match".

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed token stream: missing operand, unbalanced parentheses, bad
    /// literal grammar, invalid argument index syntax.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Syntactically well-formed but semantically invalid: unknown property
    /// or class, aggregate on a non-collection, comparing a collection to
    /// NULL, subquery variable collision, alias substitution cycle.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Argument-list errors: positional index out of range, wrong argument
    /// type for a keypath, malformed `@type` attribute string.
    #[error("Invalid query argument: {0}")]
    InvalidQueryArg(String),

    /// Misuse of a detached or invalid accessor object, propagated from the
    /// storage collaborator.
    #[error("Logic error: {0}")]
    Logic(#[from] tether_store::Error),
}
