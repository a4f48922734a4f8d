//! The public query façade: parse + bind, evaluate, describe.

use crate::binder;
use crate::describe;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::expr::Predicate;
use crate::mapping::KeyPathMapping;
use crate::ordering::DescriptorOrdering;
use crate::parsing::{self, ast::ParsedQuery};
use crate::view::TableView;
use tether_store::{GraphAccessor, TableKey, Value};

/// A bound, evaluable query. Cheap to clone; safe to evaluate from several
/// threads against independent read snapshots, but not to share one
/// instance for concurrent mutation.
#[derive(Clone, Debug)]
pub struct Query {
    table: TableKey,
    predicate: Predicate,
    ordering: DescriptorOrdering,
}

impl Query {
    /// Parses and binds query text in one step.
    pub fn from_text<A: GraphAccessor>(
        accessor: &A,
        table: TableKey,
        text: &str,
        args: &[Value],
        mapping: &KeyPathMapping,
    ) -> Result<Query> {
        let parsed = parsing::parse(text)?;
        Self::build(accessor, table, &parsed, args, mapping)
    }

    /// Binds an already-parsed AST (for example one served from the
    /// [`crate::CachingParser`]).
    pub fn build<A: GraphAccessor>(
        accessor: &A,
        table: TableKey,
        parsed: &ParsedQuery,
        args: &[Value],
        mapping: &KeyPathMapping,
    ) -> Result<Query> {
        let (predicate, ordering) = binder::bind(accessor, table, parsed, args, mapping)?;
        Ok(Query {
            table,
            predicate,
            ordering,
        })
    }

    pub fn table(&self) -> TableKey {
        self.table
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Evaluates the query, applying any trailing SORT/DISTINCT/LIMIT
    /// clauses, and materializes the result.
    pub fn find_all<A: GraphAccessor>(&self, accessor: &A) -> Result<TableView> {
        let evaluator = Evaluator::new(accessor, self.table);
        let mut keys = evaluator.find_all(&self.predicate)?;
        let excluded = self.ordering.apply(accessor, self.table, &mut keys)?;
        Ok(TableView::new(
            self.table,
            keys,
            accessor.version(),
            excluded,
            self.predicate.clone(),
            self.ordering.clone(),
        ))
    }

    pub fn count<A: GraphAccessor>(&self, accessor: &A) -> Result<usize> {
        Ok(self.find_all(accessor)?.len())
    }

    /// Renders the bound query back to canonical query text.
    pub fn description<A: GraphAccessor>(&self, accessor: &A) -> Result<String> {
        describe::describe(accessor, self.table, &self.predicate, &self.ordering)
    }
}
