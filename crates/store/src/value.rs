//! Mixed values
//!
//! [`Value`] is the tagged union used both for column storage and as the
//! runtime value during query evaluation. Cross-type numeric comparison is
//! defined; strings and binaries compare with each other bytewise; any other
//! mixed pairing is incomparable and treated as "no match" by the caller,
//! never as an error.

use crate::keys::ObjLink;
use crate::schema::ColumnType;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A 12-byte object identifier: 4 bytes of big-endian seconds followed by
/// 8 random/counter bytes. Rendered as 24 hex digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Parses 24 hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 24 {
            return None;
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(ObjectId(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

/// A dynamically typed storable value.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    Timestamp(NaiveDateTime),
    ObjectId(ObjectId),
    Uuid(uuid::Uuid),
    Link(ObjLink),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Float(_) | Value::Double(_) | Value::Decimal(_)
        )
    }

    /// The storage type this value inhabits, `None` for null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Int),
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Double(_) => Some(ColumnType::Double),
            Value::Decimal(_) => Some(ColumnType::Decimal),
            Value::String(_) => Some(ColumnType::String),
            Value::Binary(_) => Some(ColumnType::Binary),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::ObjectId(_) => Some(ColumnType::ObjectId),
            Value::Uuid(_) => Some(ColumnType::Uuid),
            Value::Link(_) => Some(ColumnType::Link),
        }
    }

    /// Canonical type name, as produced by the `@type` keypath suffix.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Timestamp(_) => "timestamp",
            Value::ObjectId(_) => "objectId",
            Value::Uuid(_) => "uuid",
            Value::Link(_) => "link",
        }
    }

    /// The additive zero of the given element type, used by `@sum` over an
    /// empty or all-null collection.
    pub fn zero(ty: ColumnType) -> Value {
        match ty {
            ColumnType::Float => Value::Float(0.0),
            ColumnType::Double => Value::Double(0.0),
            ColumnType::Decimal => Value::Decimal(Decimal::ZERO),
            _ => Value::Int(0),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::from_f32_retain(*n),
            Value::Double(n) => Decimal::from_f64_retain(*n),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Cross-type comparison. `None` means the pair is incomparable (a type
    /// mismatch), which the evaluator maps to "no match".
    pub fn partial_cmp_with(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => None,

            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),

            // Mixed numeric pairings. Floats force an f64 comparison so that
            // infinities and NaN behave; otherwise compare exactly as Decimal.
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let float_involved =
                    matches!(a, Value::Float(_) | Value::Double(_)) || matches!(b, Value::Float(_) | Value::Double(_));
                if float_involved {
                    let x = a.to_f64()?;
                    let y = b.to_f64()?;
                    match x.partial_cmp(&y) {
                        Some(ord) => Some(ord),
                        None if x.is_nan() && y.is_nan() => Some(Ordering::Equal),
                        None => None,
                    }
                } else {
                    Some(a.to_decimal()?.cmp(&b.to_decimal()?))
                }
            }

            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),

            (Value::String(a), Value::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Value::String(a), Value::Binary(b)) => Some(a.as_bytes().cmp(b.as_slice())),
            (Value::Binary(a), Value::String(b)) => Some(a.as_slice().cmp(b.as_bytes())),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),

            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::ObjectId(a), Value::ObjectId(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Link(a), Value::Link(b)) => Some(a.cmp(b)),

            _ => None,
        }
    }

    /// Total order used by sort and distinct. Null sorts first; values of
    /// incomparable types are grouped by a fixed type rank.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Float(_) | Value::Double(_) | Value::Decimal(_) => 1,
                Value::Bool(_) => 2,
                Value::String(_) | Value::Binary(_) => 3,
                Value::Timestamp(_) => 4,
                Value::ObjectId(_) => 5,
                Value::Uuid(_) => 6,
                Value::Link(_) => 7,
            }
        }
        match self.partial_cmp_with(other) {
            Some(ord) => ord,
            None => rank(self).cmp(&rank(other)),
        }
    }

    /// Numeric addition with the usual promotions (any float operand makes
    /// the result Double, any decimal operand makes it Decimal). Returns
    /// `None` on non-numeric operands.
    pub fn add_numeric(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_add(*b))),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                if matches!(a, Value::Decimal(_)) || matches!(b, Value::Decimal(_)) {
                    let x = a.to_decimal()?;
                    let y = b.to_decimal()?;
                    x.checked_add(y).map(Value::Decimal)
                } else {
                    Some(Value::Double(a.to_f64()? + b.to_f64()?))
                }
            }
            _ => None,
        }
    }

    /// Numeric division used by `@avg`. Decimal stays Decimal, everything
    /// else divides as Double.
    pub fn div_count(&self, count: usize) -> Option<Value> {
        match self {
            Value::Decimal(d) => d.checked_div(Decimal::from(count as u64)).map(Value::Decimal),
            v if v.is_numeric() => Some(Value::Double(v.to_f64()? / count as f64)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Binary(b) => write!(f, "x'{}'", hex::encode(b)),
            Value::Timestamp(ts) => write!(f, "{}", ts),
            Value::ObjectId(o) => write!(f, "oid({})", o),
            Value::Uuid(u) => write!(f, "uuid({})", u),
            Value::Link(l) => write!(f, "{}", l),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::Decimal(d) => write!(f, "Decimal({})", d),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Binary(b) => write!(f, "Binary({})", hex::encode(b)),
            Value::Timestamp(ts) => write!(f, "Timestamp({})", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::ObjectId(o) => write!(f, "{:?}", o),
            Value::Uuid(u) => write!(f, "Uuid({})", u),
            Value::Link(l) => write!(f, "Link({})", l),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::Binary(b) => b.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
            Value::ObjectId(o) => o.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::Link(l) => l.hash(state),
        }
    }
}

impl Eq for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_type_numeric_compare() {
        assert_eq!(
            Value::Int(2).partial_cmp_with(&Value::Double(2.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Float(1.5).partial_cmp_with(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Decimal(Decimal::new(225, 2)).partial_cmp_with(&Value::Double(2.25)),
            Some(Ordering::Equal)
        );
        // type mismatch is incomparable, not an error
        assert_eq!(Value::Int(1).partial_cmp_with(&Value::String("1".into())), None);
    }

    #[test]
    fn null_compares_equal_to_null_only() {
        assert_eq!(Value::Null.partial_cmp_with(&Value::Null), Some(Ordering::Equal));
        assert_eq!(Value::Null.partial_cmp_with(&Value::Int(0)), None);
    }

    #[test]
    fn string_and_binary_compare_bytewise() {
        let s = Value::String("abc".into());
        let b = Value::Binary(b"abc".to_vec());
        assert_eq!(s.partial_cmp_with(&b), Some(Ordering::Equal));
    }

    #[test]
    fn total_order_puts_null_first() {
        let mut values = vec![Value::Int(3), Value::Null, Value::Int(1)];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Int(1));
    }

    #[test]
    fn object_id_round_trips_hex() {
        let oid = ObjectId::parse("61f0289d2f34b2a47e0b1e3c").unwrap();
        assert_eq!(oid.to_string(), "61f0289d2f34b2a47e0b1e3c");
        assert!(ObjectId::parse("xyz").is_none());
    }
}
