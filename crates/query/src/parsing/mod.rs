//! Query text parsing.
//!
//! The parser turns raw query text into a syntactic AST; it only ensures
//! the syntax is well-formed and does not know whether a given property
//! exists or which column it maps to — that is the binder's job, so syntax
//! errors and semantic errors stay distinguishable.

pub mod ast;
mod caching_parser;
mod lexer;
mod parser;

use crate::error::Result;

pub use caching_parser::CachingParser;
pub use lexer::{Keyword, Lexer, Token};
pub use parser::Parser;

/// Parses query text into a syntactic AST.
pub fn parse(query: &str) -> Result<ast::ParsedQuery> {
    Parser::parse(query)
}
