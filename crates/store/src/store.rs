//! The in-memory object store.
//!
//! Tables hold objects in key order, objects hold one field per column.
//! Every link mutation keeps the inverse backlink multiset in step, so that
//! forward link existence and backlink entry existence always mirror each
//! other. Write access is single-writer by `&mut` discipline; a write
//! transaction captures an undo image that `rollback` restores wholesale.

use crate::cascade::{self, CascadeNotification, RemovedRow};
use crate::error::{Error, Result};
use crate::keys::{ColKey, ObjKey, ObjLink, TableKey};
use crate::schema::{ColumnSpec, ColumnType, CollectionKind, LinkStrength, TableSpec};
use crate::value::Value;
use crate::GraphAccessor;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

#[derive(Clone, Debug)]
enum Field {
    Scalar(Value),
    List(Vec<Value>),
    Set(Vec<Value>),
    Dictionary(BTreeMap<String, Value>),
}

#[derive(Clone, Debug, Default)]
struct Obj {
    fields: HashMap<ColKey, Field>,
    /// Inverse multiset of incoming links: one origin key entry per link
    /// occurrence, keyed by (origin table, origin column).
    backlinks: BTreeMap<(TableKey, ColKey), Vec<ObjKey>>,
}

#[derive(Clone, Debug)]
struct TableData {
    spec: TableSpec,
    objects: BTreeMap<ObjKey, Obj>,
    next_obj: u64,
}

type CascadeHandler = Box<dyn Fn(&CascadeNotification)>;

#[derive(Default)]
pub struct Store {
    tables: BTreeMap<TableKey, TableData>,
    next_table: u32,
    next_col: u64,
    version: u64,
    undo: Option<UndoImage>,
    cascade_handler: Option<CascadeHandler>,
}

#[derive(Clone)]
struct UndoImage {
    tables: BTreeMap<TableKey, TableData>,
    next_table: u32,
    next_col: u64,
    version: u64,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    // ---- schema ----

    pub fn add_table(&mut self, name: impl Into<String>) -> Result<TableKey> {
        let name = name.into();
        if self.tables.values().any(|t| t.spec.name == name) {
            return Err(Error::DuplicateTable(name));
        }
        let key = TableKey(self.next_table);
        self.next_table += 1;
        self.tables.insert(
            key,
            TableData {
                spec: TableSpec::new(key, name),
                objects: BTreeMap::new(),
                next_obj: 0,
            },
        );
        self.bump();
        Ok(key)
    }

    pub fn add_column(&mut self, table: TableKey, spec: ColumnSpec) -> Result<ColKey> {
        if spec.is_link() {
            let target = spec
                .target
                .ok_or_else(|| Error::InvalidValue(format!("link column '{}' has no target", spec.name)))?;
            if !self.tables.contains_key(&target) {
                return Err(Error::TableNotFound(target.to_string()));
            }
        }
        let key = ColKey(self.next_col);
        self.next_col += 1;
        let default = default_field(&spec);
        let data = self.table_mut(table)?;
        data.spec.push_column(key, spec)?;
        for obj in data.objects.values_mut() {
            obj.fields.insert(key, default.clone());
        }
        self.bump();
        Ok(key)
    }

    // ---- transactions ----

    pub fn begin_write(&mut self) -> Result<()> {
        if self.undo.is_some() {
            return Err(Error::AlreadyInTransaction);
        }
        self.undo = Some(UndoImage {
            tables: self.tables.clone(),
            next_table: self.next_table,
            next_col: self.next_col,
            version: self.version,
        });
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.undo.take().is_none() {
            return Err(Error::NotInTransaction);
        }
        self.bump();
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        let image = self.undo.take().ok_or(Error::NotInTransaction)?;
        self.tables = image.tables;
        self.next_table = image.next_table;
        self.next_col = image.next_col;
        self.version = image.version;
        Ok(())
    }

    // ---- object lifecycle ----

    pub fn create_object(&mut self, table: TableKey) -> Result<ObjLink> {
        let data = self.table_mut(table)?;
        let key = ObjKey(data.next_obj);
        data.next_obj += 1;
        let mut obj = Obj::default();
        for (col, spec) in data.spec.columns() {
            obj.fields.insert(col, default_field(spec));
        }
        data.objects.insert(key, obj);
        self.bump();
        Ok(ObjLink::new(table, key))
    }

    /// Removes one object, cascading over strong links and nullifying links
    /// from surviving origins, then fires the cascade notification.
    pub fn remove_object(&mut self, obj: ObjLink) -> Result<()> {
        if !self.has_object_internal(obj) {
            return Err(Error::ObjectNotFound(obj.to_string()));
        }
        let plan = cascade::collect(self, vec![obj])?;
        let notification = CascadeNotification {
            rows: plan
                .removals
                .iter()
                .map(|l| RemovedRow {
                    table: l.table,
                    key: l.key,
                })
                .collect(),
            links: plan.nullifications.clone(),
        };
        self.apply_cascade(plan)?;
        self.notify(&notification);
        Ok(())
    }

    /// Removes every object in `table`. The directly cleared rows are left
    /// out of the notification; cascaded removals and nullified links are
    /// reported.
    pub fn clear_table(&mut self, table: TableKey) -> Result<()> {
        let seeds: Vec<ObjLink> = self
            .table_ref(table)?
            .objects
            .keys()
            .map(|k| ObjLink::new(table, *k))
            .collect();
        let seed_set: HashSet<ObjLink> = seeds.iter().copied().collect();
        let plan = cascade::collect(self, seeds)?;
        let notification = CascadeNotification {
            rows: plan
                .removals
                .iter()
                .filter(|l| !seed_set.contains(l))
                .map(|l| RemovedRow {
                    table: l.table,
                    key: l.key,
                })
                .collect(),
            links: plan.nullifications.clone(),
        };
        self.apply_cascade(plan)?;
        self.notify(&notification);
        Ok(())
    }

    pub fn set_cascade_notification_handler(&mut self, handler: Option<CascadeHandler>) {
        self.cascade_handler = handler;
    }

    // ---- scalar and collection mutation ----

    pub fn set(&mut self, obj: ObjLink, col: ColKey, value: Value) -> Result<()> {
        let spec = self.column_spec(obj.table, col)?.clone();
        if spec.is_collection() {
            return Err(Error::TypeMismatch {
                expected: "single element column".into(),
                found: "collection column".into(),
            });
        }
        self.check_value(&spec, &value)?;
        let old = match self.obj_mut(obj)?.fields.insert(col, Field::Scalar(value.clone())) {
            Some(Field::Scalar(old)) => old,
            _ => Value::Null,
        };
        if let Value::Link(target) = old {
            self.remove_backlink(target, obj.table, col, obj.key);
        }
        if let Value::Link(target) = value {
            self.add_backlink(target, obj.table, col, obj.key)?;
        }
        self.bump();
        Ok(())
    }

    pub fn list_push(&mut self, obj: ObjLink, col: ColKey, value: Value) -> Result<()> {
        let spec = self.column_spec(obj.table, col)?.clone();
        self.check_element(&spec, CollectionKind::List, &value)?;
        match self.obj_mut(obj)?.fields.get_mut(&col) {
            Some(Field::List(items)) => items.push(value.clone()),
            _ => return Err(Error::Internal(format!("column {} is not a list", col))),
        }
        if let Value::Link(target) = value {
            self.add_backlink(target, obj.table, col, obj.key)?;
        }
        self.bump();
        Ok(())
    }

    pub fn list_remove(&mut self, obj: ObjLink, col: ColKey, index: usize) -> Result<()> {
        let removed = match self.obj_mut(obj)?.fields.get_mut(&col) {
            Some(Field::List(items)) => {
                if index >= items.len() {
                    return Err(Error::IndexOutOfBounds(format!("{} >= {}", index, items.len())));
                }
                items.remove(index)
            }
            _ => return Err(Error::Internal(format!("column {} is not a list", col))),
        };
        if let Value::Link(target) = removed {
            self.remove_backlink(target, obj.table, col, obj.key);
        }
        self.bump();
        Ok(())
    }

    pub fn set_insert(&mut self, obj: ObjLink, col: ColKey, value: Value) -> Result<()> {
        let spec = self.column_spec(obj.table, col)?.clone();
        self.check_element(&spec, CollectionKind::Set, &value)?;
        {
            let field = self.obj_mut(obj)?.fields.get_mut(&col);
            let items = match field {
                Some(Field::Set(items)) => items,
                _ => return Err(Error::Internal(format!("column {} is not a set", col))),
            };
            if items.contains(&value) {
                return Ok(()); // sets de-duplicate on insert
            }
            let at = items
                .binary_search_by(|probe| probe.total_cmp(&value))
                .unwrap_or_else(|e| e);
            items.insert(at, value.clone());
        }
        if let Value::Link(target) = value {
            self.add_backlink(target, obj.table, col, obj.key)?;
        }
        self.bump();
        Ok(())
    }

    pub fn set_remove(&mut self, obj: ObjLink, col: ColKey, value: &Value) -> Result<()> {
        let removed = {
            let field = self.obj_mut(obj)?.fields.get_mut(&col);
            let items = match field {
                Some(Field::Set(items)) => items,
                _ => return Err(Error::Internal(format!("column {} is not a set", col))),
            };
            match items.iter().position(|v| v == value) {
                Some(at) => Some(items.remove(at)),
                None => None,
            }
        };
        if let Some(Value::Link(target)) = removed {
            self.remove_backlink(target, obj.table, col, obj.key);
        }
        self.bump();
        Ok(())
    }

    pub fn dict_insert(
        &mut self,
        obj: ObjLink,
        col: ColKey,
        key: impl Into<String>,
        value: Value,
    ) -> Result<()> {
        let spec = self.column_spec(obj.table, col)?.clone();
        self.check_element(&spec, CollectionKind::Dictionary, &value)?;
        let old = {
            let field = self.obj_mut(obj)?.fields.get_mut(&col);
            let entries = match field {
                Some(Field::Dictionary(entries)) => entries,
                _ => return Err(Error::Internal(format!("column {} is not a dictionary", col))),
            };
            entries.insert(key.into(), value.clone())
        };
        if let Some(Value::Link(target)) = old {
            self.remove_backlink(target, obj.table, col, obj.key);
        }
        if let Value::Link(target) = value {
            self.add_backlink(target, obj.table, col, obj.key)?;
        }
        self.bump();
        Ok(())
    }

    pub fn dict_remove(&mut self, obj: ObjLink, col: ColKey, key: &str) -> Result<()> {
        let old = {
            let field = self.obj_mut(obj)?.fields.get_mut(&col);
            let entries = match field {
                Some(Field::Dictionary(entries)) => entries,
                _ => return Err(Error::Internal(format!("column {} is not a dictionary", col))),
            };
            entries.remove(key)
        };
        if let Some(Value::Link(target)) = old {
            self.remove_backlink(target, obj.table, col, obj.key);
        }
        self.bump();
        Ok(())
    }

    // ---- internal helpers shared with the cascade engine ----

    pub(crate) fn table_spec_internal(&self, table: TableKey) -> Result<&TableSpec> {
        Ok(&self.table_ref(table)?.spec)
    }

    pub(crate) fn has_object_internal(&self, obj: ObjLink) -> bool {
        self.tables
            .get(&obj.table)
            .is_some_and(|t| t.objects.contains_key(&obj.key))
    }

    /// All link targets stored in the given column of `obj`, one entry per
    /// occurrence, across scalar, list, set and dictionary fields.
    pub(crate) fn link_targets(&self, obj: ObjLink, col: ColKey) -> Result<Vec<ObjLink>> {
        let field = self
            .obj_ref(obj)?
            .fields
            .get(&col)
            .ok_or_else(|| Error::ColumnNotFound(col.to_string()))?;
        let mut targets = Vec::new();
        let mut push = |v: &Value| {
            if let Value::Link(l) = v {
                targets.push(*l);
            }
        };
        match field {
            Field::Scalar(v) => push(v),
            Field::List(items) | Field::Set(items) => items.iter().for_each(push),
            Field::Dictionary(entries) => entries.values().for_each(push),
        }
        Ok(targets)
    }

    /// Number of strong incoming link occurrences whose origin is not in
    /// `excluded` (origins already pending removal do not keep targets
    /// alive).
    pub(crate) fn strong_incoming_excluding(
        &self,
        target: ObjLink,
        excluded: &HashSet<ObjLink>,
    ) -> Result<usize> {
        let obj = self.obj_ref(target)?;
        let mut count = 0;
        for ((origin_table, origin_col), origins) in &obj.backlinks {
            let spec = self.column_spec(*origin_table, *origin_col)?;
            if spec.strength != LinkStrength::Strong {
                continue;
            }
            count += origins
                .iter()
                .filter(|k| !excluded.contains(&ObjLink::new(*origin_table, **k)))
                .count();
        }
        Ok(count)
    }

    pub(crate) fn backlink_entries(
        &self,
        target: ObjLink,
    ) -> Result<Vec<((TableKey, ColKey), Vec<ObjKey>)>> {
        Ok(self
            .obj_ref(target)?
            .backlinks
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    // ---- cascade application ----

    fn apply_cascade(&mut self, plan: cascade::CascadePlan) -> Result<()> {
        let removed: HashSet<ObjLink> = plan.removals.iter().copied().collect();

        // Nullify forward links in surviving origins. The backlink entries
        // on the target side die with the target objects.
        for n in &plan.nullifications {
            let origin = ObjLink::new(n.origin_table, n.origin_key);
            let target = Value::Link(n.old_target);
            let field = self
                .obj_mut(origin)?
                .fields
                .get_mut(&n.origin_col)
                .ok_or_else(|| Error::ColumnNotFound(n.origin_col.to_string()))?;
            match field {
                Field::Scalar(v) => *v = Value::Null,
                Field::List(items) | Field::Set(items) => {
                    if let Some(at) = items.iter().position(|v| *v == target) {
                        items.remove(at);
                    }
                }
                Field::Dictionary(entries) => {
                    for v in entries.values_mut() {
                        if *v == target {
                            *v = Value::Null;
                            break;
                        }
                    }
                }
            }
        }

        // Drop removed objects, detaching their outgoing backlink entries
        // from surviving targets first.
        for &obj in &plan.removals {
            let cols: Vec<ColKey> = self
                .table_ref(obj.table)?
                .spec
                .columns()
                .filter(|(_, c)| c.is_link())
                .map(|(k, _)| k)
                .collect();
            for col in cols {
                for target in self.link_targets(obj, col)? {
                    if !removed.contains(&target) && self.has_object_internal(target) {
                        self.remove_backlink(target, obj.table, col, obj.key);
                    }
                }
            }
            self.table_mut(obj.table)?.objects.remove(&obj.key);
        }
        debug!(removed = plan.removals.len(), "cascade applied");
        self.bump();
        Ok(())
    }

    fn notify(&mut self, notification: &CascadeNotification) {
        // Take the handler out while invoking it; it receives a shared view
        // of the report only, so it cannot mutate the graph.
        if let Some(handler) = self.cascade_handler.take() {
            handler(notification);
            self.cascade_handler = Some(handler);
        }
    }

    // ---- plumbing ----

    fn bump(&mut self) {
        self.version += 1;
    }

    fn table_ref(&self, table: TableKey) -> Result<&TableData> {
        self.tables
            .get(&table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }

    fn table_mut(&mut self, table: TableKey) -> Result<&mut TableData> {
        self.tables
            .get_mut(&table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }

    fn obj_ref(&self, obj: ObjLink) -> Result<&Obj> {
        self.table_ref(obj.table)?
            .objects
            .get(&obj.key)
            .ok_or_else(|| Error::ObjectNotFound(obj.to_string()))
    }

    fn obj_mut(&mut self, obj: ObjLink) -> Result<&mut Obj> {
        self.tables
            .get_mut(&obj.table)
            .ok_or_else(|| Error::TableNotFound(obj.table.to_string()))?
            .objects
            .get_mut(&obj.key)
            .ok_or_else(|| Error::ObjectNotFound(obj.to_string()))
    }

    fn column_spec(&self, table: TableKey, col: ColKey) -> Result<&ColumnSpec> {
        self.table_ref(table)?.spec.column(col)
    }

    fn add_backlink(
        &mut self,
        target: ObjLink,
        origin_table: TableKey,
        origin_col: ColKey,
        origin_key: ObjKey,
    ) -> Result<()> {
        self.obj_mut(target)?
            .backlinks
            .entry((origin_table, origin_col))
            .or_default()
            .push(origin_key);
        Ok(())
    }

    fn remove_backlink(
        &mut self,
        target: ObjLink,
        origin_table: TableKey,
        origin_col: ColKey,
        origin_key: ObjKey,
    ) {
        if let Ok(obj) = self.obj_mut(target) {
            if let Some(origins) = obj.backlinks.get_mut(&(origin_table, origin_col)) {
                if let Some(at) = origins.iter().position(|k| *k == origin_key) {
                    origins.remove(at);
                }
                if origins.is_empty() {
                    obj.backlinks.remove(&(origin_table, origin_col));
                }
            }
        }
    }

    fn check_value(&self, spec: &ColumnSpec, value: &Value) -> Result<()> {
        match value {
            Value::Null => {
                if !spec.nullable && !spec.is_link() && spec.ty != ColumnType::Mixed {
                    return Err(Error::NullConstraintViolation(spec.name.clone()));
                }
                Ok(())
            }
            Value::Link(target) => {
                if !spec.is_link() && spec.ty != ColumnType::Mixed {
                    return Err(Error::TypeMismatch {
                        expected: spec.ty.to_string(),
                        found: "link".into(),
                    });
                }
                if let Some(expected) = spec.target {
                    if target.table != expected {
                        return Err(Error::TypeMismatch {
                            expected: expected.to_string(),
                            found: target.table.to_string(),
                        });
                    }
                }
                if !self.has_object_internal(*target) {
                    return Err(Error::ObjectNotFound(target.to_string()));
                }
                Ok(())
            }
            v => {
                if spec.ty == ColumnType::Mixed {
                    return Ok(());
                }
                match v.column_type() {
                    Some(ty) if ty == spec.ty => Ok(()),
                    other => Err(Error::TypeMismatch {
                        expected: spec.ty.to_string(),
                        found: other.map(|t| t.to_string()).unwrap_or_else(|| "null".into()),
                    }),
                }
            }
        }
    }

    fn check_element(
        &self,
        spec: &ColumnSpec,
        expected_kind: CollectionKind,
        value: &Value,
    ) -> Result<()> {
        if spec.collection != expected_kind {
            return Err(Error::TypeMismatch {
                expected: format!("{:?} column", expected_kind),
                found: format!("{:?} column", spec.collection),
            });
        }
        self.check_value(spec, value)
    }
}

fn default_field(spec: &ColumnSpec) -> Field {
    match spec.collection {
        CollectionKind::Single => Field::Scalar(default_value(spec)),
        CollectionKind::List => Field::List(Vec::new()),
        CollectionKind::Set => Field::Set(Vec::new()),
        CollectionKind::Dictionary => Field::Dictionary(BTreeMap::new()),
    }
}

fn default_value(spec: &ColumnSpec) -> Value {
    if spec.nullable || spec.is_link() || spec.ty == ColumnType::Mixed {
        return Value::Null;
    }
    match spec.ty {
        ColumnType::Int => Value::Int(0),
        ColumnType::Bool => Value::Bool(false),
        ColumnType::Float => Value::Float(0.0),
        ColumnType::Double => Value::Double(0.0),
        ColumnType::Decimal => Value::Decimal(rust_decimal::Decimal::ZERO),
        ColumnType::String => Value::String(String::new()),
        ColumnType::Binary => Value::Binary(Vec::new()),
        ColumnType::Timestamp => Value::Timestamp(chrono::DateTime::UNIX_EPOCH.naive_utc()),
        ColumnType::ObjectId => Value::ObjectId(crate::value::ObjectId::from_bytes([0; 12])),
        ColumnType::Uuid => Value::Uuid(uuid::Uuid::nil()),
        ColumnType::Link | ColumnType::Mixed => Value::Null,
    }
}

impl GraphAccessor for Store {
    fn version(&self) -> u64 {
        self.version
    }

    fn table_keys(&self) -> Vec<TableKey> {
        self.tables.keys().copied().collect()
    }

    fn table_spec(&self, table: TableKey) -> Result<&TableSpec> {
        self.table_spec_internal(table)
    }

    fn table_by_name(&self, name: &str) -> Option<TableKey> {
        self.tables
            .values()
            .find(|t| t.spec.name == name)
            .map(|t| t.spec.key)
    }

    fn object_keys(&self, table: TableKey) -> Result<Vec<ObjKey>> {
        Ok(self.table_ref(table)?.objects.keys().copied().collect())
    }

    fn has_object(&self, obj: ObjLink) -> bool {
        self.has_object_internal(obj)
    }

    fn get_value(&self, obj: ObjLink, col: ColKey) -> Result<Value> {
        match self.obj_ref(obj)?.fields.get(&col) {
            Some(Field::Scalar(v)) => Ok(v.clone()),
            Some(_) => Err(Error::TypeMismatch {
                expected: "single element column".into(),
                found: "collection column".into(),
            }),
            None => Err(Error::ColumnNotFound(col.to_string())),
        }
    }

    fn resolve_link(&self, obj: ObjLink, col: ColKey) -> Result<Option<ObjLink>> {
        match self.get_value(obj, col)? {
            Value::Link(l) => Ok(Some(l)),
            Value::Null => Ok(None),
            v => Err(Error::TypeMismatch {
                expected: "link".into(),
                found: v.type_name().into(),
            }),
        }
    }

    fn collection(&self, obj: ObjLink, col: ColKey) -> Result<Vec<Value>> {
        match self.obj_ref(obj)?.fields.get(&col) {
            Some(Field::List(items)) | Some(Field::Set(items)) => Ok(items.clone()),
            Some(Field::Dictionary(entries)) => Ok(entries.values().cloned().collect()),
            Some(Field::Scalar(_)) => Err(Error::TypeMismatch {
                expected: "collection column".into(),
                found: "single element column".into(),
            }),
            None => Err(Error::ColumnNotFound(col.to_string())),
        }
    }

    fn dictionary(&self, obj: ObjLink, col: ColKey) -> Result<Vec<(String, Value)>> {
        match self.obj_ref(obj)?.fields.get(&col) {
            Some(Field::Dictionary(entries)) => {
                Ok(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            Some(_) => Err(Error::TypeMismatch {
                expected: "dictionary column".into(),
                found: "non-dictionary column".into(),
            }),
            None => Err(Error::ColumnNotFound(col.to_string())),
        }
    }

    fn backlinks(
        &self,
        target: ObjLink,
        origin_table: TableKey,
        origin_col: ColKey,
    ) -> Result<Vec<ObjKey>> {
        Ok(self
            .obj_ref(target)?
            .backlinks
            .get(&(origin_table, origin_col))
            .cloned()
            .unwrap_or_default())
    }

    fn backlink_count(&self, target: ObjLink) -> Result<usize> {
        Ok(self.obj_ref(target)?.backlinks.values().map(Vec::len).sum())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("tables", &self.tables.len())
            .field("version", &self.version)
            .field("in_write", &self.undo.is_some())
            .finish()
    }
}
