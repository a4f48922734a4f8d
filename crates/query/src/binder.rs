//! Second-pass binding: resolves the syntactic AST against a schema.
//!
//! Binding turns property names into `ColKey`s through link chains, expands
//! caller-supplied aliases, coerces literals against the column type they
//! are compared with, substitutes positional arguments and enforces the
//! semantic rules (aggregate applicability, collection/NULL comparisons,
//! subquery variable scoping). Anything that fails here is an
//! `InvalidQuery` or `InvalidQueryArg` error, never a syntax error.

use crate::error::{Error, Result};
use crate::expr::{AggKind, AggOp, Compare, CompareOp, Expr, Hop, Leaf, PathExpr, Predicate, Quantifier};
use crate::mapping::KeyPathMapping;
use crate::ordering::{Descriptor, DescriptorOrdering, SortKey};
use crate::parsing::ast::{
    AggNode, CompareOpNode, DescriptorNode, ExprNode, Literal, ParsedQuery, PathElem, PathNode,
    PredicateNode, QuantifierNode,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tether_store::{ColKey, ColumnType, GraphAccessor, TableKey, Value};

/// Binds a parsed query against `table`, producing the evaluable predicate
/// and the descriptor-ordering pipeline.
pub fn bind<A: GraphAccessor>(
    accessor: &A,
    table: TableKey,
    parsed: &ParsedQuery,
    args: &[Value],
    mapping: &KeyPathMapping,
) -> Result<(Predicate, DescriptorOrdering)> {
    let mut binder = Binder {
        accessor,
        args,
        mapping,
        scope: Vec::new(),
    };
    let predicate = binder.bind_predicate(table, &parsed.predicate)?;
    let ordering = binder.bind_descriptors(table, &parsed.descriptors)?;
    Ok((predicate, ordering))
}

struct Binder<'a, A: GraphAccessor> {
    accessor: &'a A,
    args: &'a [Value],
    mapping: &'a KeyPathMapping,
    /// Active subquery variables with the table their collection targets.
    scope: Vec<(String, TableKey)>,
}

/// A bound expression together with the static facts the compare-level
/// checks need.
struct BoundExpr {
    expr: Expr,
    /// Static element type, when known (`None` for null constants, Mixed
    /// columns and heterogeneous lists).
    ty: Option<ColumnType>,
    /// Whether the expression denotes a collection directly (a collection
    /// leaf or a literal list), before any aggregate collapses it.
    is_collection: bool,
    /// Whether evaluation can produce more than one value (to-many hops
    /// included).
    fans_out: bool,
    /// A collection of primitive (non-link) elements: a primitive list
    /// property or a literal list.
    is_primitive_collection: bool,
}

impl<A: GraphAccessor> Binder<'_, A> {
    fn class_name(&self, table: TableKey) -> String {
        match self.accessor.table_spec(table) {
            Ok(spec) => self.mapping.display_class_name(&spec.name).to_string(),
            Err(_) => table.to_string(),
        }
    }

    fn bind_predicate(&mut self, table: TableKey, node: &PredicateNode) -> Result<Predicate> {
        Ok(match node {
            PredicateNode::True => Predicate::True,
            PredicateNode::False => Predicate::False,
            PredicateNode::Not(inner) => {
                Predicate::Not(Box::new(self.bind_predicate(table, inner)?))
            }
            PredicateNode::And(lhs, rhs) => {
                let mut children = Vec::new();
                self.flatten_and(table, lhs, &mut children)?;
                self.flatten_and(table, rhs, &mut children)?;
                Predicate::And(children)
            }
            PredicateNode::Or(lhs, rhs) => {
                let mut children = Vec::new();
                self.flatten_or(table, lhs, &mut children)?;
                self.flatten_or(table, rhs, &mut children)?;
                Predicate::Or(children)
            }
            PredicateNode::Compare {
                op,
                case_insensitive,
                lhs,
                rhs,
            } => self.bind_compare(table, *op, *case_insensitive, lhs, rhs)?,
            PredicateNode::Between { expr, lo, hi } => {
                let bound = self.bind_expr(table, expr, None)?;
                let hint = bound.ty;
                let lo = self.literal_value(lo, hint)?;
                let hi = self.literal_value(hi, hint)?;
                Predicate::And(vec![
                    Predicate::Compare(Box::new(Compare {
                        op: CompareOp::GreaterEqual,
                        lhs: bound.expr.clone(),
                        rhs: Expr::Constant(lo),
                        case_sensitive: true,
                    })),
                    Predicate::Compare(Box::new(Compare {
                        op: CompareOp::LessEqual,
                        lhs: bound.expr,
                        rhs: Expr::Constant(hi),
                        case_sensitive: true,
                    })),
                ])
            }
        })
    }

    /// And/Or chains flatten into one n-ary node so evaluation and
    /// serialization see the whole run.
    fn flatten_and(
        &mut self,
        table: TableKey,
        node: &PredicateNode,
        out: &mut Vec<Predicate>,
    ) -> Result<()> {
        if let PredicateNode::And(lhs, rhs) = node {
            self.flatten_and(table, lhs, out)?;
            self.flatten_and(table, rhs, out)?;
        } else {
            out.push(self.bind_predicate(table, node)?);
        }
        Ok(())
    }

    fn flatten_or(
        &mut self,
        table: TableKey,
        node: &PredicateNode,
        out: &mut Vec<Predicate>,
    ) -> Result<()> {
        if let PredicateNode::Or(lhs, rhs) = node {
            self.flatten_or(table, lhs, out)?;
            self.flatten_or(table, rhs, out)?;
        } else {
            out.push(self.bind_predicate(table, node)?);
        }
        Ok(())
    }

    fn bind_compare(
        &mut self,
        table: TableKey,
        op: CompareOpNode,
        case_insensitive: bool,
        lhs_node: &ExprNode,
        rhs_node: &ExprNode,
    ) -> Result<Predicate> {
        let op = match op {
            CompareOpNode::Equal => CompareOp::Equal,
            CompareOpNode::NotEqual => CompareOp::NotEqual,
            CompareOpNode::Greater => CompareOp::Greater,
            CompareOpNode::GreaterEqual => CompareOp::GreaterEqual,
            CompareOpNode::Less => CompareOp::Less,
            CompareOpNode::LessEqual => CompareOp::LessEqual,
            CompareOpNode::BeginsWith => CompareOp::BeginsWith,
            CompareOpNode::EndsWith => CompareOp::EndsWith,
            CompareOpNode::Contains => CompareOp::Contains,
            CompareOpNode::Like => CompareOp::Like,
            CompareOpNode::In => CompareOp::In,
        };

        // Bind the structural sides first so literal sides can coerce
        // against their static type.
        let lhs_literal = matches!(lhs_node, ExprNode::Literal(_) | ExprNode::List(_));
        let rhs_literal = matches!(rhs_node, ExprNode::Literal(_) | ExprNode::List(_));
        let (lhs, rhs) = if !lhs_literal && rhs_literal {
            let lhs = self.bind_expr(table, lhs_node, None)?;
            let rhs = self.bind_expr(table, rhs_node, lhs.ty)?;
            (lhs, rhs)
        } else if lhs_literal && !rhs_literal {
            let rhs = self.bind_expr(table, rhs_node, None)?;
            let lhs = self.bind_expr(table, lhs_node, rhs.ty)?;
            (lhs, rhs)
        } else {
            let lhs = self.bind_expr(table, lhs_node, None)?;
            let rhs = self.bind_expr(table, rhs_node, lhs.ty)?;
            (lhs, rhs)
        };

        // At most one side may be universally quantified.
        let universal = |e: &Expr| !matches!(e.quantifier(), Quantifier::Any);
        if universal(&lhs.expr) && universal(&rhs.expr) {
            return Err(Error::InvalidQuery(
                "only one side of a comparison may use ALL or NONE".into(),
            ));
        }

        if op == CompareOp::In && !rhs.is_collection {
            return Err(Error::InvalidQuery(
                "the right-hand side of IN must be a collection".into(),
            ));
        }

        // A link collection itself cannot be compared with NULL; elements
        // of a primitive collection and scalars reached through to-many
        // paths can.
        let null_constant = |e: &BoundExpr| matches!(e.expr, Expr::Constant(Value::Null));
        let link_collection = |e: &BoundExpr| e.is_collection && !e.is_primitive_collection;
        if (link_collection(&lhs) && null_constant(&rhs))
            || (link_collection(&rhs) && null_constant(&lhs))
        {
            return Err(Error::InvalidQuery(
                "cannot compare a collection of objects with NULL".into(),
            ));
        }
        if lhs.is_primitive_collection && rhs.is_primitive_collection && op != CompareOp::In {
            return Err(Error::InvalidQuery(
                "cannot compare two lists of primitive values".into(),
            ));
        }

        // @type comparisons take a type-name string; validate it eagerly.
        for (type_side, other) in [(&lhs, &rhs), (&rhs, &lhs)] {
            let is_type_of = matches!(
                type_side.expr,
                Expr::Path {
                    agg: Some(AggOp {
                        kind: AggKind::TypeOf,
                        ..
                    }),
                    ..
                }
            );
            if is_type_of {
                if let Expr::Constant(Value::String(name)) = &other.expr {
                    if !KNOWN_TYPE_NAMES.contains(&name.as_str()) {
                        return Err(Error::InvalidQueryArg(format!(
                            "unknown type name '{}' in @type comparison",
                            name
                        )));
                    }
                }
            }
        }

        if matches!(
            op,
            CompareOp::BeginsWith | CompareOp::EndsWith | CompareOp::Contains | CompareOp::Like
        ) {
            for side in [&lhs, &rhs] {
                if let Some(ty) = side.ty {
                    if !matches!(ty, ColumnType::String | ColumnType::Binary | ColumnType::Mixed) {
                        return Err(Error::InvalidQuery(format!(
                            "operator '{:?}' only applies to strings and binary data, not '{}'",
                            op, ty
                        )));
                    }
                }
            }
        } else if let (Some(a), Some(b)) = (lhs.ty, rhs.ty) {
            if !types_comparable(a, b) {
                return Err(Error::InvalidQuery(format!(
                    "cannot compare '{}' with '{}'",
                    a, b
                )));
            }
        }

        Ok(Predicate::Compare(Box::new(Compare {
            op,
            lhs: lhs.expr,
            rhs: rhs.expr,
            case_sensitive: !case_insensitive,
        })))
    }

    fn bind_expr(
        &mut self,
        table: TableKey,
        node: &ExprNode,
        hint: Option<ColumnType>,
    ) -> Result<BoundExpr> {
        match node {
            ExprNode::Literal(literal) => {
                let value = self.literal_value(literal, hint)?;
                Ok(BoundExpr {
                    ty: value.column_type(),
                    expr: Expr::Constant(value),
                    is_collection: false,
                    fans_out: false,
                    is_primitive_collection: false,
                })
            }
            ExprNode::List(literals) => {
                let values = literals
                    .iter()
                    .map(|l| self.literal_value(l, hint))
                    .collect::<Result<Vec<_>>>()?;
                let mut ty = None;
                for v in &values {
                    match (ty, v.column_type()) {
                        (None, t) => ty = t,
                        (Some(a), Some(b)) if a != b => {
                            ty = None;
                            break;
                        }
                        _ => {}
                    }
                }
                Ok(BoundExpr {
                    ty,
                    expr: Expr::ConstantList(values),
                    is_collection: true,
                    fans_out: true,
                    is_primitive_collection: true,
                })
            }
            ExprNode::Path(path) => self.bind_path(table, path),
            ExprNode::Subquery {
                path,
                var,
                predicate,
            } => self.bind_subquery(table, path, var, predicate),
        }
    }

    /// Resolves a keypath through link chains to a bound [`PathExpr`].
    fn bind_path(&mut self, table: TableKey, node: &PathNode) -> Result<BoundExpr> {
        let mut current = table;
        let mut hops: Vec<Hop> = Vec::new();
        let mut leaf: Option<Leaf> = None;
        let mut fans_out = false;

        let elems = &node.elems;
        let count = elems.len();
        let mut index = 0;
        while index < count {
            let last = index + 1 == count;
            match &elems[index] {
                PathElem::Var(name) => {
                    if index != 0 {
                        return Err(Error::InvalidQuery(format!(
                            "subquery variable '${}' may only start a keypath",
                            name
                        )));
                    }
                    if !self.scope.iter().any(|(n, t)| n == name && *t == current) {
                        return Err(Error::InvalidQuery(format!(
                            "subquery variable '${}' is not defined in this context",
                            name
                        )));
                    }
                    // the variable denotes the element under evaluation;
                    // nothing to resolve
                }
                PathElem::Prop(name) => {
                    let expanded = self.mapping.translate(current, name)?;
                    let parts: Vec<&str> = expanded.split('.').collect();
                    for (part_index, part) in parts.iter().enumerate() {
                        let part_last = last && part_index + 1 == parts.len();
                        let spec = self.accessor.table_spec(current)?;
                        let col = spec.column_key(part).ok_or_else(|| {
                            Error::InvalidQuery(format!(
                                "'{}' has no property '{}'",
                                self.class_name(current),
                                part
                            ))
                        })?;
                        let col_spec = spec.column(col)?;
                        if part_last {
                            leaf = Some(Leaf::Property(col));
                            fans_out |= col_spec.is_collection();
                        } else {
                            if !col_spec.is_link() {
                                return Err(Error::InvalidQuery(format!(
                                    "property '{}' of '{}' is not a link",
                                    part,
                                    self.class_name(current)
                                )));
                            }
                            fans_out |= col_spec.is_collection();
                            let target = col_spec.target.ok_or_else(|| {
                                Error::InvalidQuery(format!("link '{}' has no target table", part))
                            })?;
                            hops.push(Hop::Link(col));
                            current = target;
                        }
                    }
                }
                PathElem::DictKey(key) => {
                    match leaf.take() {
                        Some(Leaf::Property(col)) => {
                            let spec = self.accessor.table_spec(current)?.column(col)?;
                            if spec.collection != tether_store::CollectionKind::Dictionary {
                                return Err(Error::InvalidQuery(format!(
                                    "'{}' is not a dictionary, cannot subscript it",
                                    spec.name
                                )));
                            }
                            leaf = Some(Leaf::DictElement(col, key.clone()));
                        }
                        _ => {
                            return Err(Error::InvalidQuery(
                                "a dictionary subscript must follow a dictionary property".into(),
                            ));
                        }
                    }
                }
                PathElem::Backlink { class, prop } => {
                    let (origin_table, origin_col) = self.resolve_backlink(current, class, prop)?;
                    fans_out = true;
                    if last {
                        leaf = Some(Leaf::Backlinks(Some((origin_table, origin_col))));
                    } else {
                        hops.push(Hop::Backlink {
                            origin_table,
                            origin_col,
                        });
                        current = origin_table;
                    }
                }
                PathElem::BacklinkAll => {
                    fans_out = true;
                    leaf = Some(Leaf::Backlinks(None));
                }
            }
            index += 1;
        }

        let leaf = leaf.ok_or_else(|| Error::InvalidQuery("empty keypath".into()))?;
        let quantifier = match node.quantifier {
            Some(QuantifierNode::All) => Quantifier::All,
            Some(QuantifierNode::None) => Quantifier::None,
            _ => Quantifier::Any,
        };
        let (leaf_is_collection, leaf_is_primitive) = match &leaf {
            Leaf::Property(col) => {
                let spec = self.accessor.table_spec(current)?.column(*col)?;
                (spec.is_collection(), spec.is_collection() && !spec.is_link())
            }
            Leaf::DictElement(..) => (false, false),
            Leaf::Backlinks(_) => (true, false),
        };
        if matches!(quantifier, Quantifier::All | Quantifier::None) && !fans_out {
            return Err(Error::InvalidQuery(
                "ALL and NONE require a keypath over a collection".into(),
            ));
        }

        let (agg, ty, hops, leaf, current) = self.bind_aggregate(node, current, hops, leaf)?;

        if agg.is_some()
            && !matches!(
                agg.map(|a| a.kind),
                Some(AggKind::SizeOfElement) | Some(AggKind::TypeOf)
            )
            && quantifier != Quantifier::Any
        {
            return Err(Error::InvalidQuery(
                "ALL and NONE cannot apply to an aggregate".into(),
            ));
        }

        let collapsed = matches!(
            agg.map(|a| a.kind),
            Some(AggKind::Min) | Some(AggKind::Max) | Some(AggKind::Sum) | Some(AggKind::Avg)
                | Some(AggKind::Count)
        );
        let _ = current;
        Ok(BoundExpr {
            ty,
            is_collection: leaf_is_collection && agg.is_none(),
            fans_out: fans_out && !collapsed,
            is_primitive_collection: leaf_is_primitive && agg.is_none(),
            expr: Expr::Path {
                path: PathExpr {
                    quantifier,
                    hops,
                    leaf,
                },
                agg,
            },
        })
    }

    /// Applies the aggregate attribute to a walked path, reshaping
    /// `links.@min.prop` into a hop through the collection plus a property
    /// leaf on the target table.
    #[allow(clippy::type_complexity)]
    fn bind_aggregate(
        &mut self,
        node: &PathNode,
        current: TableKey,
        mut hops: Vec<Hop>,
        leaf: Leaf,
    ) -> Result<(Option<AggOp>, Option<ColumnType>, Vec<Hop>, Leaf, TableKey)> {
        let Some(agg_node) = &node.agg else {
            let ty = self.leaf_type(current, &leaf)?;
            return Ok((None, ty, hops, leaf, current));
        };

        let (kind, target) = match agg_node {
            AggNode::Min(t) => (AggKind::Min, t.as_ref()),
            AggNode::Max(t) => (AggKind::Max, t.as_ref()),
            AggNode::Sum(t) => (AggKind::Sum, t.as_ref()),
            AggNode::Avg(t) => (AggKind::Avg, t.as_ref()),
            AggNode::Count => (AggKind::Count, None),
            AggNode::Size => (AggKind::Count, None),
            AggNode::Type => (AggKind::TypeOf, None),
        };

        match kind {
            AggKind::Count => {
                // @count/@size of a collection or backlink set; on strings
                // and binaries it is the element length instead
                match &leaf {
                    Leaf::Backlinks(_) => Ok((
                        Some(AggOp {
                            kind: AggKind::Count,
                            elem_ty: ColumnType::Int,
                        }),
                        Some(ColumnType::Int),
                        hops,
                        leaf,
                        current,
                    )),
                    Leaf::DictElement(..) => Err(Error::InvalidQuery(
                        "'@count' cannot apply to a single dictionary element".into(),
                    )),
                    Leaf::Property(col) => {
                        let spec = self.accessor.table_spec(current)?.column(*col)?;
                        if spec.is_collection() || spec.is_link() {
                            Ok((
                                Some(AggOp {
                                    kind: AggKind::Count,
                                    elem_ty: ColumnType::Int,
                                }),
                                Some(ColumnType::Int),
                                hops,
                                leaf,
                                current,
                            ))
                        } else if matches!(spec.ty, ColumnType::String | ColumnType::Binary) {
                            Ok((
                                Some(AggOp {
                                    kind: AggKind::SizeOfElement,
                                    elem_ty: ColumnType::Int,
                                }),
                                Some(ColumnType::Int),
                                hops,
                                leaf,
                                current,
                            ))
                        } else {
                            Err(Error::InvalidQuery(format!(
                                "'@size' cannot apply to property '{}' of type '{}'",
                                spec.name, spec.ty
                            )))
                        }
                    }
                }
            }
            AggKind::TypeOf => {
                let ty = self.leaf_type(current, &leaf)?;
                let elem_ty = ty.unwrap_or(ColumnType::Mixed);
                Ok((
                    Some(AggOp {
                        kind: AggKind::TypeOf,
                        elem_ty,
                    }),
                    Some(ColumnType::String),
                    hops,
                    leaf,
                    current,
                ))
            }
            _ => {
                // @min/@max/@sum/@avg
                let Leaf::Property(col) = leaf else {
                    return Err(Error::InvalidQuery(format!(
                        "'@{:?}' requires a collection property",
                        kind
                    )));
                };
                let spec = self.accessor.table_spec(current)?.column(col)?;
                if !spec.is_collection() {
                    return Err(Error::InvalidQuery(format!(
                        "aggregate operation cannot apply to property '{}' because it is not a list",
                        spec.name
                    )));
                }
                if let Some(target_prop) = target {
                    // links.@min.prop: hop through the collection
                    if !spec.is_link() {
                        return Err(Error::InvalidQuery(format!(
                            "property '{}' is not a collection of links",
                            spec.name
                        )));
                    }
                    let target_table = spec.target.ok_or_else(|| {
                        Error::InvalidQuery(format!("link '{}' has no target table", spec.name))
                    })?;
                    let expanded = self.mapping.translate(target_table, target_prop)?;
                    let target_spec = self.accessor.table_spec(target_table)?;
                    let target_col = target_spec.column_key(&expanded).ok_or_else(|| {
                        Error::InvalidQuery(format!(
                            "'{}' has no property '{}'",
                            self.class_name(target_table),
                            expanded
                        ))
                    })?;
                    let elem_ty = target_spec.column(target_col)?.ty;
                    check_aggregatable(kind, elem_ty)?;
                    hops.push(Hop::Link(col));
                    Ok((
                        Some(AggOp { kind, elem_ty }),
                        Some(elem_ty),
                        hops,
                        Leaf::Property(target_col),
                        target_table,
                    ))
                } else {
                    // prims.@min: aggregate the collection elements directly
                    if spec.is_link() {
                        return Err(Error::InvalidQuery(format!(
                            "aggregate on '{}' requires a target property on the linked objects",
                            spec.name
                        )));
                    }
                    let elem_ty = spec.ty;
                    check_aggregatable(kind, elem_ty)?;
                    Ok((
                        Some(AggOp { kind, elem_ty }),
                        Some(elem_ty),
                        hops,
                        Leaf::Property(col),
                        current,
                    ))
                }
            }
        }
    }

    fn leaf_type(&self, table: TableKey, leaf: &Leaf) -> Result<Option<ColumnType>> {
        Ok(match leaf {
            Leaf::Property(col) | Leaf::DictElement(col, _) => {
                let ty = self.accessor.table_spec(table)?.column(*col)?.ty;
                match ty {
                    ColumnType::Mixed => None,
                    other => Some(other),
                }
            }
            Leaf::Backlinks(_) => Some(ColumnType::Link),
        })
    }

    fn resolve_backlink(
        &self,
        target: TableKey,
        class: &str,
        prop: &str,
    ) -> Result<(TableKey, ColKey)> {
        let origin_table = self
            .accessor
            .table_keys()
            .into_iter()
            .find(|t| {
                self.accessor
                    .table_spec(*t)
                    .is_ok_and(|spec| self.mapping.class_matches(class, &spec.name))
            })
            .ok_or_else(|| Error::InvalidQuery(format!("unknown class '{}'", class)))?;
        let expanded = self.mapping.translate(origin_table, prop)?;
        let spec = self.accessor.table_spec(origin_table)?;
        let origin_col = spec.column_key(&expanded).ok_or_else(|| {
            Error::InvalidQuery(format!(
                "'{}' has no property '{}'",
                self.class_name(origin_table),
                expanded
            ))
        })?;
        let col_spec = spec.column(origin_col)?;
        if !col_spec.is_link() || col_spec.target != Some(target) {
            return Err(Error::InvalidQuery(format!(
                "property '{}' of '{}' does not link to '{}'",
                expanded,
                self.class_name(origin_table),
                self.class_name(target)
            )));
        }
        Ok((origin_table, origin_col))
    }

    fn bind_subquery(
        &mut self,
        table: TableKey,
        path: &PathNode,
        var: &str,
        predicate: &PredicateNode,
    ) -> Result<BoundExpr> {
        let bound = self.bind_path(table, path)?;
        let Expr::Path { path, agg } = bound.expr else {
            return Err(Error::InvalidQuery("a subquery requires a keypath".into()));
        };
        if agg.is_some() {
            return Err(Error::InvalidQuery(
                "a subquery collection cannot carry an aggregate".into(),
            ));
        }
        // the collection must produce objects to run the inner predicate on
        let element_table = match &path.leaf {
            Leaf::Backlinks(Some((origin_table, _))) => *origin_table,
            Leaf::Backlinks(None) => {
                return Err(Error::InvalidQuery(
                    "a subquery cannot operate on '@links' without a class".into(),
                ));
            }
            Leaf::Property(col) => {
                let current = self.table_of_leaf(table, &path)?;
                let spec = self.accessor.table_spec(current)?.column(*col)?;
                if !spec.is_link() {
                    if spec.is_collection() {
                        return Err(Error::InvalidQuery(format!(
                            "a subquery cannot operate on a list of primitive values (property '{}')",
                            spec.name
                        )));
                    }
                    return Err(Error::InvalidQuery(format!(
                        "a subquery must operate on a list property, but '{}' is type '{}'",
                        spec.name, spec.ty
                    )));
                }
                if !spec.is_collection() {
                    return Err(Error::InvalidQuery(format!(
                        "a subquery must operate on a list property, but '{}' is a single link",
                        spec.name
                    )));
                }
                spec.target.ok_or_else(|| {
                    Error::InvalidQuery(format!("link '{}' has no target table", spec.name))
                })?
            }
            Leaf::DictElement(..) => {
                return Err(Error::InvalidQuery(
                    "a subquery cannot operate on a single dictionary element".into(),
                ));
            }
        };

        // Variable collision is detected by name + table, not by lexical
        // nesting.
        if self
            .scope
            .iter()
            .any(|(n, t)| n == var && *t == element_table)
        {
            return Err(Error::InvalidQuery(format!(
                "unable to create a subquery expression with variable '${}' since an identical \
                 variable already exists in this context",
                var
            )));
        }
        self.scope.push((var.to_string(), element_table));
        let inner = self.bind_predicate(element_table, predicate);
        self.scope.pop();
        let inner = inner?;

        Ok(BoundExpr {
            ty: Some(ColumnType::Int),
            is_collection: false,
            fans_out: false,
            is_primitive_collection: false,
            expr: Expr::SubqueryCount {
                path,
                var: var.to_string(),
                predicate: Box::new(inner),
            },
        })
    }

    /// The table that a walked path's leaf lives on, recomputed from the
    /// hops.
    fn table_of_leaf(&self, base: TableKey, path: &PathExpr) -> Result<TableKey> {
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
        Ok(current)
    }

    // ---- literals and arguments ----

    fn literal_value(&self, literal: &Literal, hint: Option<ColumnType>) -> Result<Value> {
        Ok(match literal {
            Literal::Int(text) => {
                let n = parse_int(text)?;
                match hint {
                    Some(ColumnType::Float) => Value::Float(n as f32),
                    Some(ColumnType::Double) => Value::Double(n as f64),
                    Some(ColumnType::Decimal) => Value::Decimal(Decimal::from(n)),
                    _ => Value::Int(n),
                }
            }
            Literal::Float(text) => {
                let value = text
                    .parse::<f64>()
                    .map_err(|_| Error::Syntax(format!("bad float literal '{}'", text)))?;
                match hint {
                    Some(ColumnType::Float) => Value::Float(value as f32),
                    Some(ColumnType::Decimal) => Value::Decimal(
                        Decimal::from_str_exact(text)
                            .ok()
                            .or_else(|| Decimal::from_f64(value))
                            .ok_or_else(|| {
                                Error::InvalidQueryArg(format!(
                                    "'{}' is out of range for decimal",
                                    text
                                ))
                            })?,
                    ),
                    _ => Value::Double(value),
                }
            }
            Literal::Infinity(negative) => {
                let value = if *negative {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                };
                match hint {
                    Some(ColumnType::Float) => Value::Float(value as f32),
                    Some(ColumnType::Decimal) => {
                        return Err(Error::InvalidQuery(
                            "infinity is not representable as decimal".into(),
                        ));
                    }
                    _ => Value::Double(value),
                }
            }
            Literal::NaN => match hint {
                Some(ColumnType::Float) => Value::Float(f32::NAN),
                Some(ColumnType::Decimal) => {
                    return Err(Error::InvalidQuery(
                        "NaN is not representable as decimal".into(),
                    ));
                }
                _ => Value::Double(f64::NAN),
            },
            Literal::String(s) => Value::String(s.clone()),
            Literal::Base64(payload) => {
                let bytes = BASE64
                    .decode(payload.trim())
                    .map_err(|_| Error::Syntax(format!("bad base64 literal '{}'", payload)))?;
                match hint {
                    Some(ColumnType::String) => Value::String(
                        String::from_utf8(bytes).map_err(|_| {
                            Error::Syntax("base64 string literal is not valid utf-8".into())
                        })?,
                    ),
                    Some(ColumnType::Binary) => Value::Binary(bytes),
                    _ => match String::from_utf8(bytes) {
                        Ok(s) => Value::String(s),
                        Err(err) => Value::Binary(err.into_bytes()),
                    },
                }
            }
            Literal::Timestamp(ts) => Value::Timestamp(*ts),
            Literal::Uuid(u) => Value::Uuid(*u),
            Literal::ObjectId(oid) => Value::ObjectId(*oid),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
            Literal::Arg(index) => {
                let value = self.args.get(*index).cloned().ok_or_else(|| {
                    Error::InvalidQueryArg(format!(
                        "request for argument at index {} but only {} arguments are provided",
                        index,
                        self.args.len()
                    ))
                })?;
                if let (Some(expected), Some(actual)) = (hint, value.column_type()) {
                    let ok = expected == actual
                        || expected == ColumnType::Mixed
                        || (expected == ColumnType::String && actual == ColumnType::Binary)
                        || (expected == ColumnType::Binary && actual == ColumnType::String);
                    if !ok {
                        return Err(Error::InvalidQueryArg(format!(
                            "argument ${} has type '{}' which does not match the expected type \
                             '{}'",
                            index, actual, expected
                        )));
                    }
                }
                value
            }
        })
    }

    // ---- descriptors ----

    fn bind_descriptors(
        &mut self,
        table: TableKey,
        nodes: &[DescriptorNode],
    ) -> Result<DescriptorOrdering> {
        let mut ordering = DescriptorOrdering::new();
        for node in nodes {
            let descriptor = match node {
                DescriptorNode::Sort(keys) => Descriptor::Sort(
                    keys.iter()
                        .map(|(path, ascending)| {
                            Ok(SortKey {
                                path: self.bind_descriptor_path(table, path)?,
                                ascending: *ascending,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                DescriptorNode::Distinct(paths) => Descriptor::Distinct(
                    paths
                        .iter()
                        .map(|path| self.bind_descriptor_path(table, path))
                        .collect::<Result<Vec<_>>>()?,
                ),
                DescriptorNode::Limit(n) => Descriptor::Limit(*n),
            };
            ordering.push(descriptor);
        }
        Ok(ordering)
    }

    /// Sort/distinct keypaths traverse unary links only.
    fn bind_descriptor_path(&self, table: TableKey, path: &[String]) -> Result<Vec<ColKey>> {
        let mut current = table;
        let mut cols = Vec::with_capacity(path.len());
        for (index, name) in path.iter().enumerate() {
            let expanded = self.mapping.translate(current, name)?;
            let spec = self.accessor.table_spec(current)?;
            let col = spec.column_key(&expanded).ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "'{}' has no property '{}'",
                    self.class_name(current),
                    expanded
                ))
            })?;
            let col_spec = spec.column(col)?;
            if index + 1 < path.len() {
                if !col_spec.is_link() || col_spec.is_collection() {
                    return Err(Error::InvalidQuery(format!(
                        "cannot sort or distinct over '{}': only single links may be traversed",
                        expanded
                    )));
                }
                current = col_spec.target.ok_or_else(|| {
                    Error::InvalidQuery(format!("link '{}' has no target table", expanded))
                })?;
            } else if col_spec.is_collection() {
                return Err(Error::InvalidQuery(format!(
                    "cannot sort or distinct by collection property '{}'",
                    expanded
                )));
            }
            cols.push(col);
        }
        Ok(cols)
    }
}

const KNOWN_TYPE_NAMES: &[&str] = &[
    "null",
    "int",
    "bool",
    "float",
    "double",
    "decimal",
    "string",
    "binary",
    "timestamp",
    "objectId",
    "uuid",
    "link",
];

fn parse_int(text: &str) -> Result<i64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
            .map_err(|_| Error::Syntax(format!("bad integer literal '{}'", text)))?
    } else {
        body.parse::<i64>()
            .map_err(|_| Error::Syntax(format!("bad integer literal '{}'", text)))?
    };
    Ok(if negative { -value } else { value })
}

fn types_comparable(a: ColumnType, b: ColumnType) -> bool {
    if a == b || a == ColumnType::Mixed || b == ColumnType::Mixed {
        return true;
    }
    let stringish = |t: ColumnType| matches!(t, ColumnType::String | ColumnType::Binary);
    (a.is_numeric() && b.is_numeric()) || (stringish(a) && stringish(b))
}

fn check_aggregatable(kind: AggKind, ty: ColumnType) -> Result<()> {
    let ok = match kind {
        AggKind::Min | AggKind::Max => ty.is_numeric() || ty == ColumnType::Timestamp || ty == ColumnType::Mixed,
        AggKind::Sum | AggKind::Avg => ty.is_numeric() || ty == ColumnType::Mixed,
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidQuery(format!(
            "collection aggregate not supported for type '{}'",
            ty
        )))
    }
}

