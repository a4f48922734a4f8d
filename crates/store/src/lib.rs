//! An in-memory, transactional linked-object store.
//!
//! Objects live in tables, are addressed by stable keys and are connected by
//! typed links (scalar, list, set and dictionary valued) with automatically
//! maintained backlinks. The store provides:
//! - single-writer write transactions with rollback
//! - the read-only [`GraphAccessor`] surface consumed by the query engine
//! - cascading deletes over strong links and nullification of weak links,
//!   reported through [`CascadeNotification`]

mod accessor;
mod cascade;
mod error;
mod keys;
mod schema;
mod store;
mod value;

pub use accessor::GraphAccessor;
pub use cascade::{CascadeNotification, NullifiedLink, RemovedRow};
pub use error::{Error, Result};
pub use keys::{ColKey, ObjKey, ObjLink, TableKey};
pub use schema::{ColumnSpec, ColumnType, CollectionKind, LinkStrength, TableSpec};
pub use store::Store;
pub use value::{ObjectId, Value};
