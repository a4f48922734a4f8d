//! Descriptor ordering: the sort/distinct/limit pipeline applied to a match
//! set after predicate evaluation.
//!
//! Stages apply strictly in the order they were appended. Sort is stable
//! with per-key direction and nulls first ascending; distinct keeps the
//! first occurrence in the current order; each limit records how many
//! results it alone excluded.

use crate::error::{Error, Result};
use tether_store::{ColKey, GraphAccessor, ObjKey, TableKey, Value};

/// One sort key: a unary link chain ending in a scalar column.
#[derive(Clone, Debug, PartialEq)]
pub struct SortKey {
    pub path: Vec<ColKey>,
    pub ascending: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Descriptor {
    Sort(Vec<SortKey>),
    Distinct(Vec<Vec<ColKey>>),
    Limit(usize),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescriptorOrdering {
    descriptors: Vec<Descriptor>,
}

impl DescriptorOrdering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: Descriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn extend(&mut self, other: DescriptorOrdering) {
        self.descriptors.extend(other.descriptors);
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Applies every stage to `keys` in order, returning the number of
    /// results excluded by limit stages.
    pub fn apply<A: GraphAccessor>(
        &self,
        accessor: &A,
        table: TableKey,
        keys: &mut Vec<ObjKey>,
    ) -> Result<usize> {
        let mut excluded = 0;
        for descriptor in &self.descriptors {
            match descriptor {
                Descriptor::Sort(sort_keys) => {
                    let mut decorated: Vec<(ObjKey, Vec<Value>)> = keys
                        .iter()
                        .map(|&key| {
                            let tuple = sort_keys
                                .iter()
                                .map(|sk| key_value(accessor, table, key, &sk.path))
                                .collect::<Result<Vec<_>>>()?;
                            Ok((key, tuple))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    decorated.sort_by(|(_, a), (_, b)| {
                        for (index, sort_key) in sort_keys.iter().enumerate() {
                            let ord = a[index].total_cmp(&b[index]);
                            if ord != std::cmp::Ordering::Equal {
                                return if sort_key.ascending { ord } else { ord.reverse() };
                            }
                        }
                        std::cmp::Ordering::Equal
                    });
                    *keys = decorated.into_iter().map(|(key, _)| key).collect();
                }
                Descriptor::Distinct(paths) => {
                    let mut seen: std::collections::HashSet<Vec<Value>> =
                        std::collections::HashSet::new();
                    let mut kept = Vec::with_capacity(keys.len());
                    for &key in keys.iter() {
                        let tuple = paths
                            .iter()
                            .map(|path| key_value(accessor, table, key, path))
                            .collect::<Result<Vec<_>>>()?;
                        if seen.insert(tuple) {
                            kept.push(key);
                        }
                    }
                    *keys = kept;
                }
                Descriptor::Limit(n) => {
                    if keys.len() > *n {
                        excluded += keys.len() - n;
                        keys.truncate(*n);
                    }
                }
            }
        }
        Ok(excluded)
    }
}

/// Reads the value a sort/distinct keypath denotes for one object. A broken
/// link chain reads as null, which sorts first ascending.
fn key_value<A: GraphAccessor>(
    accessor: &A,
    table: TableKey,
    key: ObjKey,
    path: &[ColKey],
) -> Result<Value> {
    let mut current = table;
    let mut obj = Some(tether_store::ObjLink::new(table, key));
    for (index, col) in path.iter().enumerate() {
        let Some(o) = obj else {
            return Ok(Value::Null);
        };
        if index + 1 == path.len() {
            return Ok(accessor.get_value(o, *col)?);
        }
        let spec = accessor.table_spec(current)?.column(*col)?;
        let target = spec
            .target
            .ok_or_else(|| Error::InvalidQuery(format!("'{}' is not a link", spec.name)))?;
        obj = accessor.resolve_link(o, *col)?;
        current = target;
    }
    Ok(Value::Null)
}
