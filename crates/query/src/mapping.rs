//! Caller-supplied keypath aliasing.
//!
//! Bindings may rename classes and properties (SDKs map user-facing names
//! onto stored ones) and configure a class-name prefix that is stripped from
//! error messages. Alias substitution follows chains and rejects cycles at
//! bind time. Subquery variables are registered here transiently while the
//! inner predicate binds, which is also what detects variable collisions.

use crate::error::{Error, Result};
use std::collections::HashMap;
use tether_store::TableKey;

#[derive(Clone, Debug, Default)]
pub struct KeyPathMapping {
    class_prefix: Option<String>,
    aliases: HashMap<(TableKey, String), String>,
}

impl KeyPathMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class_prefix(prefix: impl Into<String>) -> Self {
        KeyPathMapping {
            class_prefix: Some(prefix.into()),
            aliases: HashMap::new(),
        }
    }

    /// Registers `name` as an alias for `replacement` (a property name or a
    /// dotted keypath) on `table`. Returns false when the name is taken.
    pub fn add_alias(
        &mut self,
        table: TableKey,
        name: impl Into<String>,
        replacement: impl Into<String>,
    ) -> bool {
        let key = (table, name.into());
        if self.aliases.contains_key(&key) {
            return false;
        }
        self.aliases.insert(key, replacement.into());
        true
    }

    pub fn remove_alias(&mut self, table: TableKey, name: &str) {
        self.aliases.remove(&(table, name.to_string()));
    }

    pub fn has_alias(&self, table: TableKey, name: &str) -> bool {
        self.aliases.contains_key(&(table, name.to_string()))
    }

    /// Resolves `name` on `table` through alias chains. A substitution cycle
    /// is a bind-time error. The result may be a dotted keypath.
    pub fn translate(&self, table: TableKey, name: &str) -> Result<String> {
        let mut current = name.to_string();
        let mut seen: Vec<String> = Vec::new();
        while let Some(next) = self.aliases.get(&(table, current.clone())) {
            if seen.contains(&current) {
                return Err(Error::InvalidQuery(format!(
                    "substitution loop detected while expanding alias '{}'",
                    name
                )));
            }
            seen.push(current);
            current = next.clone();
        }
        Ok(current)
    }

    /// Table display name with the class prefix stripped, for error
    /// messages.
    pub fn display_class_name<'a>(&self, table_name: &'a str) -> &'a str {
        match &self.class_prefix {
            Some(prefix) => table_name.strip_prefix(prefix.as_str()).unwrap_or(table_name),
            None => table_name,
        }
    }

    /// Resolves a class name as written in a query (`@links.Class.prop`)
    /// against a stored table name, honoring the configured prefix.
    pub fn class_matches(&self, written: &str, table_name: &str) -> bool {
        if written == table_name {
            return true;
        }
        match &self.class_prefix {
            Some(prefix) => table_name
                .strip_prefix(prefix.as_str())
                .is_some_and(|stripped| stripped == written),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_chains_resolve() {
        let table = TableKey(0);
        let mut mapping = KeyPathMapping::new();
        assert!(mapping.add_alias(table, "a", "b"));
        assert!(mapping.add_alias(table, "b", "c"));
        assert!(!mapping.add_alias(table, "a", "x"));
        assert_eq!(mapping.translate(table, "a").unwrap(), "c");
        assert_eq!(mapping.translate(table, "unmapped").unwrap(), "unmapped");
    }

    #[test]
    fn self_referential_alias_is_an_error() {
        let table = TableKey(0);
        let mut mapping = KeyPathMapping::new();
        mapping.add_alias(table, "a", "b");
        mapping.add_alias(table, "b", "a");
        let err = mapping.translate(table, "a").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn class_prefix_is_stripped_for_display() {
        let mapping = KeyPathMapping::with_class_prefix("class_");
        assert_eq!(mapping.display_class_name("class_Person"), "Person");
        assert!(mapping.class_matches("Person", "class_Person"));
        assert!(mapping.class_matches("class_Person", "class_Person"));
    }
}
