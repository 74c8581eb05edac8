use std::cmp::Ordering;
use std::fmt::{self, Display};

use crate::operator::{ArithmeticOp, ComparisonOp};
use crate::tristate::TriState;

/// A typed scalar: either a literal in a selector or a message property value.
///
/// JMS integral property types (byte, short, int, long) all widen into
/// `Integer`, and float/double into `Float`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Compare two values under selector typing rules.
    ///
    /// Mismatched types and orderings on strings or booleans are `Unknown`.
    pub fn compare(&self, op: ComparisonOp, other: &Value) -> TriState {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => ordering_satisfies(op, a.cmp(b)).into(),
            (Value::String(a), Value::String(b)) if op.is_equality() => {
                equality_satisfies(op, a == b)
            }
            (Value::Boolean(a), Value::Boolean(b)) if op.is_equality() => {
                equality_satisfies(op, a == b)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => match a.partial_cmp(&b) {
                    Some(ord) => ordering_satisfies(op, ord).into(),
                    // NaN is unequal to everything, itself included
                    None => TriState::from(op == ComparisonOp::NotEquals),
                },
                _ => TriState::Unknown,
            },
        }
    }

    /// Whether the two values are equal under selector semantics.
    pub fn selector_eq(&self, other: &Value) -> bool {
        self.compare(ComparisonOp::Equals, other).is_true()
    }

    /// Apply an arithmetic operator; `None` stands for an absent result.
    pub fn arithmetic(&self, op: ArithmeticOp, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                let result = match op {
                    ArithmeticOp::Add => a.checked_add(*b),
                    ArithmeticOp::Subtract => a.checked_sub(*b),
                    ArithmeticOp::Multiply => a.checked_mul(*b),
                    ArithmeticOp::Divide => a.checked_div(*b),
                };
                result.map(Value::Integer)
            }
            (a, b) => {
                let (a, b) = (a.as_f64()?, b.as_f64()?);
                let result = match op {
                    ArithmeticOp::Add => a + b,
                    ArithmeticOp::Subtract => a - b,
                    ArithmeticOp::Multiply => a * b,
                    ArithmeticOp::Divide => a / b,
                };
                Some(Value::Float(result))
            }
        }
    }

    pub fn negate(&self) -> Option<Value> {
        match self {
            Value::Integer(i) => i.checked_neg().map(Value::Integer),
            Value::Float(f) => Some(Value::Float(-f)),
            _ => None,
        }
    }
}

fn ordering_satisfies(op: ComparisonOp, ord: Ordering) -> bool {
    match op {
        ComparisonOp::Equals => ord == Ordering::Equal,
        ComparisonOp::NotEquals => ord != Ordering::Equal,
        ComparisonOp::Less => ord == Ordering::Less,
        ComparisonOp::LessOrEqual => ord != Ordering::Greater,
        ComparisonOp::Greater => ord == Ordering::Greater,
        ComparisonOp::GreaterOrEqual => ord != Ordering::Less,
    }
}

fn equality_satisfies(op: ComparisonOp, equal: bool) -> TriState {
    match op {
        ComparisonOp::Equals => equal.into(),
        _ => (!equal).into(),
    }
}

/// Quote a string as a selector literal, doubling embedded quotes.
pub(crate) fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(&quote(s)),
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps a decimal point or exponent, so the text re-reads as a float
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

macro_rules! integer_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Integer(i64::from(i))
                }
            }
        )*
    };
}

integer_value!(i8, i16, i32, i64);
