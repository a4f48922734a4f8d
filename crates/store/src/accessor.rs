//! The read-only object-graph surface consumed by the query engine.
//!
//! The evaluator, parser binder and descriptor pipeline only ever see this
//! trait, never the store itself, so alternative storage backends can be
//! plugged in behind it.

use crate::error::Result;
use crate::keys::{ColKey, ObjKey, ObjLink, TableKey};
use crate::schema::TableSpec;
use crate::value::Value;

pub trait GraphAccessor {
    /// Monotonically increasing mutation counter; used by table views to
    /// detect staleness.
    fn version(&self) -> u64;

    fn table_keys(&self) -> Vec<TableKey>;

    fn table_spec(&self, table: TableKey) -> Result<&TableSpec>;

    fn table_by_name(&self, name: &str) -> Option<TableKey>;

    /// Object keys in table storage order.
    fn object_keys(&self, table: TableKey) -> Result<Vec<ObjKey>>;

    fn has_object(&self, obj: ObjLink) -> bool;

    /// The value of a single-element column. Link cells read as
    /// `Value::Link` or `Value::Null`.
    fn get_value(&self, obj: ObjLink, col: ColKey) -> Result<Value>;

    fn resolve_link(&self, obj: ObjLink, col: ColKey) -> Result<Option<ObjLink>>;

    /// All elements of a list/set column, or the values of a dictionary
    /// column, in deterministic order. Fresh and finite per call.
    fn collection(&self, obj: ObjLink, col: ColKey) -> Result<Vec<Value>>;

    /// Key/value pairs of a dictionary column in key order.
    fn dictionary(&self, obj: ObjLink, col: ColKey) -> Result<Vec<(String, Value)>>;

    /// Keys of the objects in `origin_table` whose `origin_col` links to
    /// `target`, one entry per link occurrence.
    fn backlinks(&self, target: ObjLink, origin_table: TableKey, origin_col: ColKey)
        -> Result<Vec<ObjKey>>;

    /// Total number of incoming link occurrences across all origins.
    fn backlink_count(&self, target: ObjLink) -> Result<usize>;
}
