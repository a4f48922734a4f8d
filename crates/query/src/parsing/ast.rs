//! The purely syntactic query AST.
//!
//! The parser only guarantees well-formed syntax; names are unresolved and
//! numeric literals keep their text so the binder can coerce them against
//! the column type they are compared with. Structured literals (timestamps,
//! uuids, object ids) are validated and converted eagerly, so a bad literal
//! is a parse-time error.

use chrono::NaiveDateTime;
use tether_store::ObjectId;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedQuery {
    pub predicate: PredicateNode,
    /// Trailing SORT/DISTINCT/LIMIT clauses in the order written.
    pub descriptors: Vec<DescriptorNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PredicateNode {
    True,
    False,
    And(Box<PredicateNode>, Box<PredicateNode>),
    Or(Box<PredicateNode>, Box<PredicateNode>),
    Not(Box<PredicateNode>),
    Compare {
        op: CompareOpNode,
        case_insensitive: bool,
        lhs: ExprNode,
        rhs: ExprNode,
    },
    Between {
        expr: ExprNode,
        lo: Literal,
        hi: Literal,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOpNode {
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
pub enum ExprNode {
    Literal(Literal),
    /// A literal list: `{1, 2, 3}`.
    List(Vec<Literal>),
    Path(PathNode),
    Subquery {
        path: PathNode,
        var: String,
        predicate: Box<PredicateNode>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathNode {
    pub quantifier: Option<QuantifierNode>,
    pub elems: Vec<PathElem>,
    pub agg: Option<AggNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PathElem {
    /// A property name, resolved by the binder.
    Prop(String),
    /// A subquery variable reference (`$x`), valid in leading position.
    Var(String),
    /// A dictionary element subscript: `['key']`.
    DictKey(String),
    /// `@links.Class.property`.
    Backlink { class: String, prop: String },
    /// Bare `@links`, valid only before `@count`.
    BacklinkAll,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AggNode {
    /// `.@min` over a primitive collection, `.@min.prop` through links.
    Min(Option<String>),
    Max(Option<String>),
    Sum(Option<String>),
    Avg(Option<String>),
    Count,
    Size,
    Type,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantifierNode {
    Any,
    All,
    None,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Integer text, possibly signed or hex.
    Int(String),
    /// Float text, possibly signed, with optional exponent.
    Float(String),
    Infinity(bool),
    NaN,
    String(String),
    /// Base64 payload, decoded by the binder (element type dependent).
    Base64(String),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    ObjectId(ObjectId),
    Bool(bool),
    Null,
    /// Positional argument `$n`.
    Arg(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DescriptorNode {
    /// `SORT(path ASC, path DESC, ...)`; true is ascending.
    Sort(Vec<(Vec<String>, bool)>),
    /// `DISTINCT(path, ...)`.
    Distinct(Vec<Vec<String>>),
    /// `LIMIT(n)`.
    Limit(usize),
}
