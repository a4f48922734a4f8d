//! Materialized query results.
//!
//! A [`TableView`] is a match set captured against one store version. It
//! stays usable after further mutations; `sync_if_needed` re-evaluates on
//! demand (pull-based, never automatic), which is also the point where a
//! stale view can simply be dropped instead.

use crate::error::Result;
use crate::eval::Evaluator;
use crate::expr::Predicate;
use crate::ordering::DescriptorOrdering;
use tether_store::{GraphAccessor, ObjKey, TableKey};

#[derive(Clone, Debug)]
pub struct TableView {
    table: TableKey,
    keys: Vec<ObjKey>,
    version: u64,
    excluded_by_limit: usize,
    predicate: Predicate,
    ordering: DescriptorOrdering,
}

impl TableView {
    pub(crate) fn new(
        table: TableKey,
        keys: Vec<ObjKey>,
        version: u64,
        excluded_by_limit: usize,
        predicate: Predicate,
        ordering: DescriptorOrdering,
    ) -> Self {
        TableView {
            table,
            keys,
            version,
            excluded_by_limit,
            predicate,
            ordering,
        }
    }

    pub fn table(&self) -> TableKey {
        self.table
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ObjKey> {
        self.keys.get(index).copied()
    }

    pub fn keys(&self) -> &[ObjKey] {
        &self.keys
    }

    pub fn contains(&self, key: ObjKey) -> bool {
        self.keys.contains(&key)
    }

    /// Results excluded by limit stages, summed over every limit applied to
    /// this view.
    pub fn num_results_excluded_by_limit(&self) -> usize {
        self.excluded_by_limit
    }

    /// Applies further ordering stages to the current result set; they
    /// become part of the view and survive re-synchronization.
    pub fn apply_descriptor<A: GraphAccessor>(
        &mut self,
        accessor: &A,
        descriptor: DescriptorOrdering,
    ) -> Result<()> {
        self.excluded_by_limit += descriptor.apply(accessor, self.table, &mut self.keys)?;
        self.ordering.extend(descriptor);
        Ok(())
    }

    /// Re-evaluates against the current store version when it moved.
    /// Returns whether a re-evaluation happened.
    pub fn sync_if_needed<A: GraphAccessor>(&mut self, accessor: &A) -> Result<bool> {
        if accessor.version() == self.version {
            return Ok(false);
        }
        let evaluator = Evaluator::new(accessor, self.table);
        self.keys = evaluator.find_all(&self.predicate)?;
        self.excluded_by_limit = self.ordering.apply(accessor, self.table, &mut self.keys)?;
        self.version = accessor.version();
        Ok(true)
    }
}
