//! Table and column descriptors.

use crate::error::{Error, Result};
use crate::keys::{ColKey, TableKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Bool,
    Float,
    Double,
    Decimal,
    String,
    Binary,
    Timestamp,
    ObjectId,
    Uuid,
    Link,
    Mixed,
}

impl ColumnType {
    pub fn is_link(&self) -> bool {
        matches!(self, ColumnType::Link)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Int | ColumnType::Float | ColumnType::Double | ColumnType::Decimal
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int => "int",
            ColumnType::Bool => "bool",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::String => "string",
            ColumnType::Binary => "binary",
            ColumnType::Timestamp => "timestamp",
            ColumnType::ObjectId => "objectId",
            ColumnType::Uuid => "uuid",
            ColumnType::Link => "link",
            ColumnType::Mixed => "mixed",
        };
        write!(f, "{}", name)
    }
}

/// Whether a column holds a single element or a collection of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    #[default]
    Single,
    List,
    Set,
    Dictionary,
}

impl CollectionKind {
    pub fn is_collection(&self) -> bool {
        !matches!(self, CollectionKind::Single)
    }
}

/// Strong links keep their target alive; weak links are nullified when the
/// target goes away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStrength {
    #[default]
    Weak,
    Strong,
}

/// Descriptor for one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub collection: CollectionKind,
    /// Target table for Link columns (and Mixed columns restricted to one).
    pub target: Option<TableKey>,
    pub strength: LinkStrength,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        ColumnSpec {
            name: name.into(),
            ty,
            nullable: false,
            collection: CollectionKind::Single,
            target: None,
            strength: LinkStrength::Weak,
        }
    }

    pub fn link(name: impl Into<String>, target: TableKey) -> Self {
        let mut spec = Self::new(name, ColumnType::Link);
        spec.nullable = true;
        spec.target = Some(target);
        spec
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.collection = CollectionKind::List;
        self
    }

    pub fn set(mut self) -> Self {
        self.collection = CollectionKind::Set;
        self
    }

    pub fn dictionary(mut self) -> Self {
        self.collection = CollectionKind::Dictionary;
        self
    }

    pub fn strong(mut self) -> Self {
        self.strength = LinkStrength::Strong;
        self
    }

    pub fn is_link(&self) -> bool {
        self.ty.is_link()
    }

    pub fn is_collection(&self) -> bool {
        self.collection.is_collection()
    }
}

/// Descriptor for one table: its key, name and columns in creation order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub key: TableKey,
    pub name: String,
    columns: Vec<(ColKey, ColumnSpec)>,
}

impl TableSpec {
    pub(crate) fn new(key: TableKey, name: String) -> Self {
        TableSpec {
            key,
            name,
            columns: Vec::new(),
        }
    }

    pub(crate) fn push_column(&mut self, key: ColKey, spec: ColumnSpec) -> Result<()> {
        if self.columns.iter().any(|(_, c)| c.name == spec.name) {
            return Err(Error::DuplicateColumn(spec.name));
        }
        self.columns.push((key, spec));
        Ok(())
    }

    pub fn columns(&self) -> impl Iterator<Item = (ColKey, &ColumnSpec)> {
        self.columns.iter().map(|(k, c)| (*k, c))
    }

    pub fn column(&self, key: ColKey) -> Result<&ColumnSpec> {
        self.columns
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, c)| c)
            .ok_or_else(|| Error::ColumnNotFound(key.to_string()))
    }

    pub fn column_key(&self, name: &str) -> Option<ColKey> {
        self.columns
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(k, _)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_column_rejected() {
        let mut spec = TableSpec::new(TableKey(0), "t".into());
        spec.push_column(ColKey(0), ColumnSpec::new("age", ColumnType::Int))
            .unwrap();
        let err = spec
            .push_column(ColKey(1), ColumnSpec::new("age", ColumnType::Int))
            .unwrap_err();
        assert_eq!(err, Error::DuplicateColumn("age".into()));
    }
}
