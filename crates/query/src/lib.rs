//! Query engine for the tether object graph.
//!
//! The pipeline is: [`parsing::parse`] turns query text into a syntactic
//! AST, [`bind`] resolves it against a schema into a closed expression
//! tree, [`Evaluator`] walks the tree per candidate object through the
//! read-only [`tether_store::GraphAccessor`] surface, and [`describe`]
//! renders any bound tree back to canonical text that re-parses to an
//! equivalent query. [`Query`] ties the steps together; [`TableView`]
//! materializes results with on-demand re-synchronization.

mod binder;
mod describe;
mod error;
mod eval;
mod expr;
mod mapping;
mod ordering;
pub mod parsing;
mod query;
mod view;

pub use binder::bind;
pub use describe::describe;
pub use error::{Error, Result};
pub use eval::Evaluator;
pub use expr::{
    AggKind, AggOp, Compare, CompareOp, Expr, Hop, Leaf, PathExpr, Predicate, Quantifier,
};
pub use mapping::KeyPathMapping;
pub use ordering::{Descriptor, DescriptorOrdering, SortKey};
pub use parsing::CachingParser;
pub use parsing::parse;
pub use query::Query;
pub use view::TableView;
