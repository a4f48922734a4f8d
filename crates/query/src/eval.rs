//! Predicate evaluation over the object graph.
//!
//! Each candidate object is tested independently; a path produces a finite
//! value sequence re-created fresh per candidate (no iterator is shared
//! across objects). Null and type-mismatch handling is deliberate and not
//! SQL tri-valued logic: `null == null` is true, ordering against null is
//! false, and incomparable types are "not equal" rather than an error.

use crate::expr::{AggKind, AggOp, Compare, CompareOp, Expr, Hop, Leaf, PathExpr, Predicate, Quantifier};
use crate::error::{Error, Result};
use std::borrow::Cow;
use std::cmp::Ordering;
use tether_store::{ColumnSpec, GraphAccessor, ObjKey, ObjLink, TableKey, Value};
use tracing::trace;

pub struct Evaluator<'a, A: GraphAccessor> {
    accessor: &'a A,
    table: TableKey,
}

/// The values a path produced for one candidate, plus the nulls that only
/// exist for comparison purposes: a broken unary link chain and a null
/// scalar link compare as null but contribute nothing to aggregates.
struct Seq {
    values: Vec<Value>,
    compare_nulls: usize,
}

impl Seq {
    fn single(value: Value) -> Seq {
        Seq {
            values: vec![value],
            compare_nulls: 0,
        }
    }

    fn effective(&self) -> Vec<&Value> {
        static NULL: Value = Value::Null;
        let mut out: Vec<&Value> = self.values.iter().collect();
        for _ in 0..self.compare_nulls {
            out.push(&NULL);
        }
        out
    }
}

impl<'a, A: GraphAccessor> Evaluator<'a, A> {
    pub fn new(accessor: &'a A, table: TableKey) -> Self {
        Evaluator { accessor, table }
    }

    /// Evaluates the predicate over every object of the table, returning the
    /// matching keys in storage order.
    pub fn find_all(&self, predicate: &Predicate) -> Result<Vec<ObjKey>> {
        let mut matches = Vec::new();
        for key in self.accessor.object_keys(self.table)? {
            if self.test(key, predicate)? {
                matches.push(key);
            }
        }
        trace!(table = %self.table, matches = matches.len(), "query evaluated");
        Ok(matches)
    }

    pub fn test(&self, obj: ObjKey, predicate: &Predicate) -> Result<bool> {
        Ok(match predicate {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::And(children) => {
                for child in children {
                    if !self.test(obj, child)? {
                        return Ok(false);
                    }
                }
                true
            }
            Predicate::Or(children) => {
                for child in children {
                    if self.test(obj, child)? {
                        return Ok(true);
                    }
                }
                false
            }
            Predicate::Not(inner) => !self.test(obj, inner)?,
            Predicate::Compare(cmp) => self.compare(obj, cmp)?,
        })
    }

    fn compare(&self, obj: ObjKey, cmp: &Compare) -> Result<bool> {
        let lhs = self.eval_expr(obj, &cmp.lhs)?;
        let rhs = self.eval_expr(obj, &cmp.rhs)?;
        let lvals = lhs.effective();
        let rvals = rhs.effective();
        let hit = |l: &Value, r: &Value| matches(cmp.op, l, r, cmp.case_sensitive);

        Ok(match (cmp.lhs.quantifier(), cmp.rhs.quantifier()) {
            (Quantifier::All, _) => lvals.iter().all(|l| rvals.iter().any(|r| hit(l, r))),
            (Quantifier::None, _) => !lvals.iter().any(|l| rvals.iter().any(|r| hit(l, r))),
            (_, Quantifier::All) => rvals.iter().all(|r| lvals.iter().any(|l| hit(l, r))),
            (_, Quantifier::None) => !rvals.iter().any(|r| lvals.iter().any(|l| hit(l, r))),
            _ => lvals.iter().any(|l| rvals.iter().any(|r| hit(l, r))),
        })
    }

    fn eval_expr(&self, obj: ObjKey, expr: &Expr) -> Result<Seq> {
        match expr {
            Expr::Constant(value) => Ok(Seq::single(value.clone())),
            Expr::ConstantList(values) => Ok(Seq {
                values: values.clone(),
                compare_nulls: 0,
            }),
            Expr::Path { path, agg } => {
                // @links.@count counts incoming links across every origin
                if let (Leaf::Backlinks(None), Some(AggOp { kind: AggKind::Count, .. })) =
                    (&path.leaf, agg)
                {
                    let (objs, _, _, _) = self.walk_hops(obj, &path.hops)?;
                    let mut count = 0;
                    for o in objs {
                        count += self.accessor.backlink_count(o)?;
                    }
                    return Ok(Seq::single(Value::Int(count as i64)));
                }
                let seq = self.eval_path(obj, path)?;
                match agg {
                    Some(op) => Ok(apply_aggregate(seq, *op)),
                    None => Ok(seq),
                }
            }
            Expr::SubqueryCount {
                path, predicate, ..
            } => {
                let elements = self.eval_path_objects(obj, path)?;
                let mut count = 0i64;
                for element in elements {
                    let sub = Evaluator::new(self.accessor, element.table);
                    if sub.test(element.key, predicate)? {
                        count += 1;
                    }
                }
                Ok(Seq::single(Value::Int(count)))
            }
        }
    }

    /// Walks the hops of a path. Returns the reached objects, the table they
    /// live in, whether the chain fanned out, and the number of chains that
    /// broke on a null scalar link while still unary.
    fn walk_hops(
        &self,
        obj: ObjKey,
        hops: &[Hop],
    ) -> Result<(Vec<ObjLink>, TableKey, bool, usize)> {
        let mut objs = vec![ObjLink::new(self.table, obj)];
        let mut current = self.table;
        let mut fanned = false;
        let mut broken = 0usize;

        for hop in hops {
            let mut next = Vec::new();
            match hop {
                Hop::Link(col) => {
                    let spec = self.column_spec(current, *col)?;
                    let target = spec.target.ok_or_else(|| {
                        Error::InvalidQuery(format!("link '{}' has no target table", spec.name))
                    })?;
                    if spec.is_collection() {
                        for o in &objs {
                            for v in self.accessor.collection(*o, *col)? {
                                if let Value::Link(link) = v {
                                    next.push(link);
                                }
                            }
                        }
                        fanned = true;
                    } else {
                        for o in &objs {
                            match self.accessor.resolve_link(*o, *col)? {
                                Some(link) => next.push(link),
                                None => {
                                    if !fanned {
                                        broken += 1;
                                    }
                                }
                            }
                        }
                    }
                    current = target;
                }
                Hop::Backlink {
                    origin_table,
                    origin_col,
                } => {
                    for o in &objs {
                        for key in self.accessor.backlinks(*o, *origin_table, *origin_col)? {
                            next.push(ObjLink::new(*origin_table, key));
                        }
                    }
                    fanned = true;
                    current = *origin_table;
                }
            }
            objs = next;
        }
        Ok((objs, current, fanned, broken))
    }

    fn eval_path(&self, obj: ObjKey, path: &PathExpr) -> Result<Seq> {
        let (objs, current, _fanned, broken) = self.walk_hops(obj, &path.hops)?;
        let mut values = Vec::new();
        let mut compare_nulls = broken;

        match &path.leaf {
            Leaf::Property(col) => {
                let spec = self.column_spec(current, *col)?;
                if spec.is_collection() {
                    for o in &objs {
                        values.extend(self.accessor.collection(*o, *col)?);
                    }
                } else {
                    for o in &objs {
                        let value = self.accessor.get_value(*o, *col)?;
                        // a null link cell compares as null but is not a
                        // countable element
                        if spec.is_link() && value.is_null() {
                            compare_nulls += 1;
                        } else {
                            values.push(value);
                        }
                    }
                }
            }
            Leaf::DictElement(col, key) => {
                for o in &objs {
                    let entry = self
                        .accessor
                        .dictionary(*o, *col)?
                        .into_iter()
                        .find(|(k, _)| k == key);
                    values.push(entry.map(|(_, v)| v).unwrap_or(Value::Null));
                }
            }
            Leaf::Backlinks(Some((origin_table, origin_col))) => {
                for o in &objs {
                    for key in self.accessor.backlinks(*o, *origin_table, *origin_col)? {
                        values.push(Value::Link(ObjLink::new(*origin_table, key)));
                    }
                }
            }
            Leaf::Backlinks(None) => {
                return Err(Error::InvalidQuery(
                    "'@links' requires an origin class or '@count'".into(),
                ));
            }
        }
        Ok(Seq {
            values,
            compare_nulls,
        })
    }

    /// The objects a collection path denotes; used by subqueries.
    fn eval_path_objects(&self, obj: ObjKey, path: &PathExpr) -> Result<Vec<ObjLink>> {
        let (objs, current, _, _) = self.walk_hops(obj, &path.hops)?;
        let mut elements = Vec::new();
        match &path.leaf {
            Leaf::Property(col) => {
                let spec = self.column_spec(current, *col)?;
                if !spec.is_link() {
                    return Err(Error::InvalidQuery(format!(
                        "'{}' is not a collection of objects",
                        spec.name
                    )));
                }
                for o in &objs {
                    if spec.is_collection() {
                        for v in self.accessor.collection(*o, *col)? {
                            if let Value::Link(link) = v {
                                elements.push(link);
                            }
                        }
                    } else if let Some(link) = self.accessor.resolve_link(*o, *col)? {
                        elements.push(link);
                    }
                }
            }
            Leaf::Backlinks(Some((origin_table, origin_col))) => {
                for o in &objs {
                    for key in self.accessor.backlinks(*o, *origin_table, *origin_col)? {
                        elements.push(ObjLink::new(*origin_table, key));
                    }
                }
            }
            _ => {
                return Err(Error::InvalidQuery(
                    "a subquery requires a collection of objects".into(),
                ));
            }
        }
        Ok(elements)
    }

    fn column_spec(&self, table: TableKey, col: tether_store::ColKey) -> Result<&ColumnSpec> {
        Ok(self.accessor.table_spec(table)?.column(col)?)
    }
}

/// Collapses or maps a value sequence per the aggregate kind. `@sum` of an
/// empty or all-null sequence is the typed zero; `@min/@max/@avg` are null;
/// `@count` includes null elements; `@size`/`@type` map per element.
fn apply_aggregate(seq: Seq, op: AggOp) -> Seq {
    let non_null = || seq.values.iter().filter(|v| !v.is_null());
    match op.kind {
        AggKind::Count => Seq::single(Value::Int(seq.values.len() as i64)),
        AggKind::SizeOfElement => Seq {
            values: seq
                .values
                .iter()
                .map(|v| match v {
                    Value::String(s) => Value::Int(s.len() as i64),
                    Value::Binary(b) => Value::Int(b.len() as i64),
                    _ => Value::Null,
                })
                .collect(),
            compare_nulls: seq.compare_nulls,
        },
        AggKind::TypeOf => Seq {
            values: seq
                .values
                .iter()
                .map(|v| Value::String(v.type_name().to_string()))
                .collect(),
            compare_nulls: seq.compare_nulls,
        },
        AggKind::Min => {
            let min = non_null().min_by(|a, b| a.total_cmp(b)).cloned();
            Seq::single(min.unwrap_or(Value::Null))
        }
        AggKind::Max => {
            let max = non_null().max_by(|a, b| a.total_cmp(b)).cloned();
            Seq::single(max.unwrap_or(Value::Null))
        }
        AggKind::Sum => {
            let mut sum = Value::zero(op.elem_ty);
            for v in non_null() {
                if let Some(next) = sum.add_numeric(v) {
                    sum = next;
                }
            }
            Seq::single(sum)
        }
        AggKind::Avg => {
            let mut sum = Value::zero(op.elem_ty);
            let mut count = 0usize;
            for v in non_null() {
                if let Some(next) = sum.add_numeric(v) {
                    sum = next;
                    count += 1;
                }
            }
            if count == 0 {
                Seq::single(Value::Null)
            } else {
                Seq::single(sum.div_count(count).unwrap_or(Value::Null))
            }
        }
    }
}

/// Element-level comparison. Null rules: `null == null` is true, ordering
/// against null is false, `!=` is true when exactly one side is null.
/// Incomparable types are unequal, never an error.
fn matches(op: CompareOp, l: &Value, r: &Value, case_sensitive: bool) -> bool {
    match op {
        CompareOp::Equal | CompareOp::In => equal_values(l, r, case_sensitive),
        CompareOp::NotEqual => match (l.is_null(), r.is_null()) {
            (true, true) => false,
            (true, false) | (false, true) => true,
            _ => !equal_values(l, r, case_sensitive),
        },
        CompareOp::Greater | CompareOp::GreaterEqual | CompareOp::Less | CompareOp::LessEqual => {
            if l.is_null() || r.is_null() {
                return false;
            }
            match l.partial_cmp_with(r) {
                Some(Ordering::Greater) => {
                    matches!(op, CompareOp::Greater | CompareOp::GreaterEqual)
                }
                Some(Ordering::Less) => matches!(op, CompareOp::Less | CompareOp::LessEqual),
                Some(Ordering::Equal) => {
                    matches!(op, CompareOp::GreaterEqual | CompareOp::LessEqual)
                }
                None => false,
            }
        }
        CompareOp::BeginsWith => string_op(l, r, case_sensitive, |t, n| t.starts_with(n)),
        CompareOp::EndsWith => string_op(l, r, case_sensitive, |t, n| t.ends_with(n)),
        CompareOp::Contains => string_op(l, r, case_sensitive, |t, n| {
            n.is_empty() || t.windows(n.len().max(1)).any(|w| w == n)
        }),
        CompareOp::Like => like_match(l, r, case_sensitive),
    }
}

fn equal_values(l: &Value, r: &Value, case_sensitive: bool) -> bool {
    if l.is_null() && r.is_null() {
        return true;
    }
    if l.is_null() || r.is_null() {
        return false;
    }
    if !case_sensitive {
        if let (Some(a), Some(b)) = (text_of(l), text_of(r)) {
            return a.to_lowercase() == b.to_lowercase();
        }
    }
    l.partial_cmp_with(r) == Some(Ordering::Equal)
}

fn text_of(v: &Value) -> Option<Cow<'_, str>> {
    match v {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Binary(b) => std::str::from_utf8(b).ok().map(Cow::Borrowed),
        _ => None,
    }
}

fn bytes_of(v: &Value) -> Option<&[u8]> {
    match v {
        Value::String(s) => Some(s.as_bytes()),
        Value::Binary(b) => Some(b.as_slice()),
        _ => None,
    }
}

/// Substring operators work bytewise; with `[c]` both sides are lowercased
/// first (which requires both to be valid text).
fn string_op(
    target: &Value,
    needle: &Value,
    case_sensitive: bool,
    test: impl Fn(&[u8], &[u8]) -> bool,
) -> bool {
    if !case_sensitive {
        if let (Some(t), Some(n)) = (text_of(target), text_of(needle)) {
            return test(t.to_lowercase().as_bytes(), n.to_lowercase().as_bytes());
        }
        return false;
    }
    match (bytes_of(target), bytes_of(needle)) {
        (Some(t), Some(n)) => test(t, n),
        _ => false,
    }
}

/// `LIKE` wildcards: `*` matches any run, `?` matches one character.
fn like_match(target: &Value, pattern: &Value, case_sensitive: bool) -> bool {
    let (Some(t), Some(p)) = (text_of(target), text_of(pattern)) else {
        return false;
    };
    let (t, p) = if case_sensitive {
        (t.to_string(), p.to_string())
    } else {
        (t.to_lowercase(), p.to_lowercase())
    };
    let text: Vec<char> = t.chars().collect();
    let pat: Vec<char> = p.chars().collect();
    like_rec(&text, &pat)
}

fn like_rec(text: &[char], pat: &[char]) -> bool {
    match pat.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| like_rec(&text[skip..], rest)),
        Some(('?', rest)) => !text.is_empty() && like_rec(&text[1..], rest),
        Some((&c, rest)) => text.first() == Some(&c) && like_rec(&text[1..], rest),
    }
}
