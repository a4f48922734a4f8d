//! Description serialization: renders a bound expression tree back to the
//! textual grammar.
//!
//! The output is canonical rather than a copy of the input text; the
//! guarantee is that re-parsing the description selects the same objects.
//! Strings that cannot be safely quoted render as `B64"..."` literals,
//! binary data always does, and object constants render as opaque `O<n>`
//! placeholders unique within one serialization pass.

use crate::error::{Error, Result};
use crate::expr::{AggKind, AggOp, Compare, CompareOp, Expr, Hop, Leaf, PathExpr, Predicate, Quantifier};
use crate::ordering::{Descriptor, DescriptorOrdering};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::HashMap;
use tether_store::{ColKey, GraphAccessor, ObjLink, TableKey, Value};

/// Renders `predicate` (and trailing ordering clauses) against the schema
/// reachable through `accessor`.
pub fn describe<A: GraphAccessor>(
    accessor: &A,
    table: TableKey,
    predicate: &Predicate,
    ordering: &DescriptorOrdering,
) -> Result<String> {
    let mut serializer = Serializer {
        accessor,
        placeholders: HashMap::new(),
        active_vars: Vec::new(),
    };
    let mut out = serializer.predicate_text(table, predicate)?;
    for descriptor in ordering.descriptors() {
        out.push(' ');
        out.push_str(&serializer.descriptor_text(table, descriptor)?);
    }
    Ok(out)
}

struct Serializer<'a, A: GraphAccessor> {
    accessor: &'a A,
    /// Object constants are rendered as O0, O1, ... per serialization pass.
    placeholders: HashMap<ObjLink, usize>,
    /// Subquery variables currently in scope, for collision-avoiding
    /// renaming.
    active_vars: Vec<String>,
}

impl<A: GraphAccessor> Serializer<'_, A> {
    fn predicate_text(&mut self, table: TableKey, predicate: &Predicate) -> Result<String> {
        Ok(match predicate {
            Predicate::True => "TRUEPREDICATE".to_string(),
            Predicate::False => "FALSEPREDICATE".to_string(),
            Predicate::Not(inner) => format!("!({})", self.predicate_text(table, inner)?),
            Predicate::And(children) => {
                let parts = children
                    .iter()
                    .map(|child| {
                        let text = self.predicate_text(table, child)?;
                        Ok(match child {
                            Predicate::Or(_) => format!("({})", text),
                            _ => text,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                parts.join(" && ")
            }
            Predicate::Or(children) => {
                let parts = children
                    .iter()
                    .map(|child| self.predicate_text(table, child))
                    .collect::<Result<Vec<_>>>()?;
                parts.join(" || ")
            }
            Predicate::Compare(cmp) => self.compare_text(table, cmp)?,
        })
    }

    fn compare_text(&mut self, table: TableKey, cmp: &Compare) -> Result<String> {
        let op = match cmp.op {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::BeginsWith => "BEGINSWITH",
            CompareOp::EndsWith => "ENDSWITH",
            CompareOp::Contains => "CONTAINS",
            CompareOp::Like => "LIKE",
            CompareOp::In => "IN",
        };
        let flag = if cmp.case_sensitive { "" } else { "[c]" };
        let lhs = self.expr_text(table, &cmp.lhs)?;
        let rhs = self.expr_text(table, &cmp.rhs)?;
        Ok(format!("{} {}{} {}", lhs, op, flag, rhs))
    }

    fn expr_text(&mut self, table: TableKey, expr: &Expr) -> Result<String> {
        Ok(match expr {
            Expr::Constant(value) => self.value_text(value),
            Expr::ConstantList(values) => {
                let parts: Vec<String> = values.iter().map(|v| self.value_text(v)).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Expr::Path { path, agg } => self.path_text(table, path, *agg)?,
            Expr::SubqueryCount {
                path,
                var,
                predicate,
            } => {
                let path_text = self.path_text(table, path, None)?;
                let element_table = self.leaf_table(table, path)?;
                // pick a variable name not already taken by an enclosing
                // scope
                let mut name = var.clone();
                let mut counter = 1;
                while self.active_vars.contains(&name) {
                    name = format!("{}{}", var, counter);
                    counter += 1;
                }
                self.active_vars.push(name.clone());
                let inner = self.predicate_text(element_table, predicate);
                self.active_vars.pop();
                format!("SUBQUERY({}, ${}, {}).@count", path_text, name, inner?)
            }
        })
    }

    fn path_text(
        &mut self,
        table: TableKey,
        path: &PathExpr,
        agg: Option<AggOp>,
    ) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();
        let mut current = table;
        for hop in &path.hops {
            match hop {
                Hop::Link(col) => {
                    let spec = self.accessor.table_spec(current)?.column(*col)?;
                    parts.push(spec.name.clone());
                    current = spec.target.ok_or_else(|| {
                        Error::InvalidQuery(format!("'{}' is not a link", spec.name))
                    })?;
                }
                Hop::Backlink {
                    origin_table,
                    origin_col,
                } => {
                    parts.push(self.backlink_text(*origin_table, *origin_col)?);
                    current = *origin_table;
                }
            }
        }

        // @min/@max/@sum/@avg through a link collection render before the
        // final property; over a primitive collection they render after it.
        let mut leaf_parts: Vec<String> = Vec::new();
        match &path.leaf {
            Leaf::Property(col) => {
                let spec = self.accessor.table_spec(current)?.column(*col)?;
                leaf_parts.push(spec.name.clone());
            }
            Leaf::DictElement(col, key) => {
                let spec = self.accessor.table_spec(current)?.column(*col)?;
                leaf_parts.push(format!("{}['{}']", spec.name, key));
            }
            Leaf::Backlinks(Some((origin_table, origin_col))) => {
                leaf_parts.push(self.backlink_text(*origin_table, *origin_col)?);
            }
            Leaf::Backlinks(None) => leaf_parts.push("@links".to_string()),
        }

        if let Some(op) = agg {
            let attr = match op.kind {
                AggKind::Min => "@min",
                AggKind::Max => "@max",
                AggKind::Sum => "@sum",
                AggKind::Avg => "@avg",
                AggKind::Count => "@count",
                AggKind::SizeOfElement => "@size",
                AggKind::TypeOf => "@type",
            };
            match op.kind {
                AggKind::Min | AggKind::Max | AggKind::Sum | AggKind::Avg => {
                    let leaf_is_collection = match &path.leaf {
                        Leaf::Property(col) => self
                            .accessor
                            .table_spec(current)?
                            .column(*col)?
                            .is_collection(),
                        _ => false,
                    };
                    if leaf_is_collection {
                        // prims.@min
                        leaf_parts.push(attr.to_string());
                    } else {
                        // links.@min.prop: the collection is the last hop
                        let prop = leaf_parts.pop().unwrap_or_default();
                        leaf_parts.push(attr.to_string());
                        leaf_parts.push(prop);
                    }
                }
                _ => leaf_parts.push(attr.to_string()),
            }
        }

        parts.extend(leaf_parts);
        let quantifier = match path.quantifier {
            Quantifier::Any => "",
            Quantifier::All => "ALL ",
            Quantifier::None => "NONE ",
        };
        Ok(format!("{}{}", quantifier, parts.join(".")))
    }

    fn backlink_text(&self, origin_table: TableKey, origin_col: ColKey) -> Result<String> {
        let spec = self.accessor.table_spec(origin_table)?;
        let col = spec.column(origin_col)?;
        Ok(format!("@links.{}.{}", spec.name, col.name))
    }

    /// The table a path's leaf (or the objects it denotes) lives on.
    fn leaf_table(&self, base: TableKey, path: &PathExpr) -> Result<TableKey> {
        let mut current = base;
        for hop in &path.hops {
            current = match hop {
                Hop::Link(col) => self
                    .accessor
                    .table_spec(current)?
                    .column(*col)?
                    .target
                    .ok_or_else(|| Error::InvalidQuery("link has no target table".into()))?,
                Hop::Backlink { origin_table, .. } => *origin_table,
            };
        }
        match &path.leaf {
            Leaf::Property(col) => {
                let spec = self.accessor.table_spec(current)?.column(*col)?;
                Ok(spec.target.unwrap_or(current))
            }
            Leaf::Backlinks(Some((origin_table, _))) => Ok(*origin_table),
            _ => Ok(current),
        }
    }

    fn value_text(&mut self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Float(v) => {
                if v.is_nan() {
                    "NaN".to_string()
                } else if v.is_infinite() {
                    if *v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
                } else {
                    v.to_string()
                }
            }
            Value::Double(v) => float_text(*v),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => string_text(s),
            Value::Binary(b) => format!("B64\"{}\"", BASE64.encode(b)),
            Value::Timestamp(ts) => {
                let utc = ts.and_utc();
                format!("T{}:{}", utc.timestamp(), utc.timestamp_subsec_nanos())
            }
            Value::ObjectId(oid) => format!("oid({})", oid),
            Value::Uuid(u) => format!("uuid({})", u),
            Value::Link(link) => {
                let next = self.placeholders.len();
                let id = *self.placeholders.entry(*link).or_insert(next);
                format!("O{}", id)
            }
        }
    }
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

/// Plain ASCII strings render quoted; anything with control characters,
/// quotes, backslashes or non-ASCII text falls back to a base64 literal so
/// the description always re-parses.
fn string_text(s: &str) -> String {
    let safe = s
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');
    if safe {
        format!("\"{}\"", s)
    } else {
        format!("B64\"{}\"", BASE64.encode(s.as_bytes()))
    }
}

impl<A: GraphAccessor> Serializer<'_, A> {
    fn descriptor_text(&self, table: TableKey, descriptor: &Descriptor) -> Result<String> {
        Ok(match descriptor {
            Descriptor::Sort(keys) => {
                let parts = keys
                    .iter()
                    .map(|key| {
                        let path = self.descriptor_path_text(table, &key.path)?;
                        Ok(format!(
                            "{} {}",
                            path,
                            if key.ascending { "ASC" } else { "DESC" }
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                format!("SORT({})", parts.join(", "))
            }
            Descriptor::Distinct(paths) => {
                let parts = paths
                    .iter()
                    .map(|path| self.descriptor_path_text(table, path))
                    .collect::<Result<Vec<_>>>()?;
                format!("DISTINCT({})", parts.join(", "))
            }
            Descriptor::Limit(n) => format!("LIMIT({})", n),
        })
    }

    fn descriptor_path_text(&self, table: TableKey, path: &[ColKey]) -> Result<String> {
        let mut current = table;
        let mut parts = Vec::with_capacity(path.len());
        for (index, col) in path.iter().enumerate() {
            let spec = self.accessor.table_spec(current)?.column(*col)?;
            parts.push(spec.name.clone());
            if index + 1 < path.len() {
                current = spec.target.ok_or_else(|| {
                    Error::InvalidQuery(format!("'{}' is not a link", spec.name))
                })?;
            }
        }
        Ok(parts.join("."))
    }
}
