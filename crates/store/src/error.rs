//! Error types for the object store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    DuplicateTable(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("NULL constraint violation on column: {0}")]
    NullConstraintViolation(String),

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("No write transaction is active")]
    NotInTransaction,

    #[error("A write transaction is already active")]
    AlreadyInTransaction,

    #[error("Internal error: {0}")]
    Internal(String),
}
