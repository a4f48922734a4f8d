//! The bound expression tree.
//!
//! A closed set of tagged variants with exhaustive matching in the evaluator
//! and the description serializer; adding a node kind is a compile-checked
//! change to both match sites. Nodes reference columns by `ColKey`, so a
//! bound tree stays valid across unrelated schema changes.

use tether_store::{ColKey, ColumnType, TableKey, Value};

/// Existential/universal interpretation of a collection-valued path in a
/// comparison. A bare comparison over a collection is `Any`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
    None,
}

/// One navigation step of a keypath.
#[derive(Clone, Debug, PartialEq)]
pub enum Hop {
    /// Dereference a link column; a to-many column fans out.
    Link(ColKey),
    /// Fan out to the objects of `origin_table` whose `origin_col` links to
    /// the current object.
    Backlink {
        origin_table: TableKey,
        origin_col: ColKey,
    },
}

/// What a path finally produces.
#[derive(Clone, Debug, PartialEq)]
pub enum Leaf {
    /// The value(s) of a column; collections fan out.
    Property(ColKey),
    /// One element of a dictionary column; a missing key reads as null.
    DictElement(ColKey, String),
    /// Incoming links, as link values. `None` enumerates every origin
    /// (the `@links.@count` form).
    Backlinks(Option<(TableKey, ColKey)>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathExpr {
    pub quantifier: Quantifier,
    pub hops: Vec<Hop>,
    pub leaf: Leaf,
}

/// Aggregate suffix applied to the sequence a path produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggKind {
    Min,
    Max,
    Sum,
    Avg,
    /// Element count, nulls included.
    Count,
    /// Per-element byte length of a string/binary value; preserves fan-out.
    SizeOfElement,
    /// Per-element type name; preserves fan-out.
    TypeOf,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggOp {
    pub kind: AggKind,
    /// Element type of the aggregated values; picks the typed zero of an
    /// empty `@sum`.
    pub elem_ty: ColumnType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Constant(Value),
    /// A literal list, the right-hand side of `IN {…}`.
    ConstantList(Vec<Value>),
    Path {
        path: PathExpr,
        agg: Option<AggOp>,
    },
    /// `SUBQUERY(path, $var, predicate).@count`: the number of elements of
    /// the collection path for which the predicate holds.
    SubqueryCount {
        path: PathExpr,
        var: String,
        predicate: Box<Predicate>,
    },
}

impl Expr {
    pub fn quantifier(&self) -> Quantifier {
        match self {
            Expr::Path { path, .. } => path.quantifier,
            _ => Quantifier::Any,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    BeginsWith,
    EndsWith,
    Contains,
    Like,
    In,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compare {
    pub op: CompareOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub case_sensitive: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare(Box<Compare>),
}
