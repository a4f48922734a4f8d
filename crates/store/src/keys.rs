//! Stable opaque identifiers for tables, columns and objects.
//!
//! Keys are plain integers wrapped in newtypes. They are unique within their
//! scope for the lifetime of the store and are never reused while referenced,
//! so they can be held across transactions and used as map keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a table within a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableKey(pub u32);

/// Identifies a column within a table. Column keys are allocated from a
/// store-global counter, so a `ColKey` is unambiguous without its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColKey(pub u64);

/// Identifies an object within a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjKey(pub u64);

/// A fully qualified object reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjLink {
    pub table: TableKey,
    pub key: ObjKey,
}

impl ObjLink {
    pub fn new(table: TableKey, key: ObjKey) -> Self {
        ObjLink { table, key }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for ColKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl fmt::Display for ObjKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K{}", self.0)
    }
}

impl fmt::Display for ObjLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}
