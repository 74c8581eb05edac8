pub mod frame;

use std::fmt::{self, Display};

use itertools::Itertools;
use recursion::{Collapsible, CollapsibleExt};

use self::frame::ExprFrame;
use crate::like::LikePattern;
use crate::operator::{ArithmeticOp, ComparisonOp, UnaryOp};
use crate::value::{quote, Value};

/// Operand list of an `IN` clause: string literals, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteralList(pub Vec<String>);

impl StringLiteralList {
    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, s: &str) -> bool {
        self.0.iter().any(|item| item == s)
    }
}

impl Display for StringLiteralList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().map(|s| quote(s)).join(", "))
    }
}

/// Message selector expression tree
///
/// Trees are immutable once built; evaluation only reads them. Long `AND`
/// chains nest one level per term, so every walk over the tree (rendering,
/// evaluation, cloning, comparison, drop) runs on a heap stack.
#[derive(Debug)]
pub enum Expr {
    /// header or property reference, resolved at evaluation time
    Identifier(String),
    Literal(Value),
    // boolean connectives
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Comparison(ComparisonOp, Box<Self>, Box<Self>),
    Arithmetic(ArithmeticOp, Box<Self>, Box<Self>),
    Unary(UnaryOp, Box<Self>),
    Between {
        operand: Box<Self>,
        low: Box<Self>,
        high: Box<Self>,
        negated: bool,
    },
    In {
        operand: Box<Self>,
        list: StringLiteralList,
        negated: bool,
    },
    Like {
        operand: Box<Self>,
        pattern: LikePattern,
        negated: bool,
    },
    IsNull {
        operand: Box<Self>,
        negated: bool,
    },
}

// binding strength, loosest first
const OR: u8 = 1;
const AND: u8 = 2;
const NOT: u8 = 3;
const CONDITION: u8 = 4;
const ADDITIVE: u8 = 5;
const MULTIPLICATIVE: u8 = 6;
const UNARY: u8 = 7;
const PRIMARY: u8 = 8;

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }
    pub fn and(a: Self, b: Self) -> Self {
        Self::And(Box::new(a), Box::new(b))
    }
    pub fn or(a: Self, b: Self) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }
    #[allow(clippy::should_implement_trait)]
    pub fn not(a: Self) -> Self {
        Self::Not(Box::new(a))
    }
    pub fn compare(op: ComparisonOp, a: Self, b: Self) -> Self {
        Self::Comparison(op, Box::new(a), Box::new(b))
    }
    pub fn equals(a: Self, b: Self) -> Self {
        Self::compare(ComparisonOp::Equals, a, b)
    }
    pub fn arithmetic(op: ArithmeticOp, a: Self, b: Self) -> Self {
        Self::Arithmetic(op, Box::new(a), Box::new(b))
    }
    pub fn unary(op: UnaryOp, a: Self) -> Self {
        Self::Unary(op, Box::new(a))
    }
    pub fn between(operand: Self, low: Self, high: Self, negated: bool) -> Self {
        Self::Between {
            operand: Box::new(operand),
            low: Box::new(low),
            high: Box::new(high),
            negated,
        }
    }
    pub fn in_list<S: Into<String>>(
        operand: Self,
        items: impl IntoIterator<Item = S>,
        negated: bool,
    ) -> Self {
        Self::In {
            operand: Box::new(operand),
            list: StringLiteralList(items.into_iter().map(Into::into).collect()),
            negated,
        }
    }
    pub fn like(operand: Self, pattern: LikePattern, negated: bool) -> Self {
        Self::Like {
            operand: Box::new(operand),
            pattern,
            negated,
        }
    }
    pub fn is_null(operand: Self, negated: bool) -> Self {
        Self::IsNull {
            operand: Box::new(operand),
            negated,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Self::Identifier(_) | Self::Literal(_))
    }

    /// Move non-leaf children out, leaving cheap leaves in their place.
    fn take_children(&mut self, out: &mut Vec<Expr>) {
        let mut take = |x: &mut Box<Expr>| {
            if !x.is_leaf() {
                out.push(std::mem::replace(&mut **x, Expr::Literal(Value::Boolean(false))));
            }
        };
        match self {
            Self::Identifier(_) | Self::Literal(_) => {}
            Self::Not(x)
            | Self::Unary(_, x)
            | Self::In { operand: x, .. }
            | Self::Like { operand: x, .. }
            | Self::IsNull { operand: x, .. } => take(x),
            Self::And(a, b)
            | Self::Or(a, b)
            | Self::Comparison(_, a, b)
            | Self::Arithmetic(_, a, b) => {
                take(a);
                take(b);
            }
            Self::Between {
                operand, low, high, ..
            } => {
                take(operand);
                take(low);
                take(high);
            }
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut e) = pending.pop() {
            e.take_children(&mut pending);
        }
    }
}

impl Clone for Expr {
    fn clone(&self) -> Self {
        self.collapse_frames(|frame| match frame {
            ExprFrame::Identifier(name) => Expr::Identifier(name.to_string()),
            ExprFrame::Literal(value) => Expr::Literal(value.clone()),
            ExprFrame::Not(x) => Expr::not(x),
            ExprFrame::And(a, b) => Expr::and(a, b),
            ExprFrame::Or(a, b) => Expr::or(a, b),
            ExprFrame::Comparison(op, a, b) => Expr::compare(op, a, b),
            ExprFrame::Arithmetic(op, a, b) => Expr::arithmetic(op, a, b),
            ExprFrame::Unary(op, x) => Expr::unary(op, x),
            ExprFrame::Between {
                operand,
                low,
                high,
                negated,
            } => Expr::between(operand, low, high, negated),
            ExprFrame::In {
                operand,
                list,
                negated,
            } => Expr::In {
                operand: Box::new(operand),
                list: list.clone(),
                negated,
            },
            ExprFrame::Like {
                operand,
                pattern,
                negated,
            } => Expr::like(operand, pattern.clone(), negated),
            ExprFrame::IsNull { operand, negated } => Expr::is_null(operand, negated),
        })
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            let (shape_a, children_a) = a.into_frame().split();
            let (shape_b, children_b) = b.into_frame().split();
            if shape_a != shape_b {
                return false;
            }
            pending.extend(children_a.into_iter().zip(children_b));
        }
        true
    }
}

fn not_keyword(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

/// A rendered subtree and how tightly its outermost operator binds
struct Rendered {
    text: String,
    precedence: u8,
    // starts with a sign, or is a number a preceding sign would fold into
    signed: bool,
}

impl Rendered {
    fn new(text: String, precedence: u8) -> Self {
        Rendered {
            text,
            precedence,
            signed: false,
        }
    }

    /// Text for an operand position that needs at least `min` binding strength
    fn operand(self, min: u8) -> String {
        if self.precedence < min {
            format!("({})", self.text)
        } else {
            self.text
        }
    }

    fn binary(a: Rendered, op: &str, b: Rendered, precedence: u8, left: u8, right: u8) -> Self {
        let mut text = a.operand(left);
        text.push(' ');
        text.push_str(op);
        text.push(' ');
        text.push_str(&b.operand(right));
        Rendered::new(text, precedence)
    }
}

impl Expr {
    fn render(&self) -> String {
        let rendered = self.collapse_frames(|frame: ExprFrame<'_, Rendered>| match frame {
            ExprFrame::Identifier(name) => Rendered::new(name.to_string(), PRIMARY),
            ExprFrame::Literal(value) => Rendered {
                text: value.to_string(),
                precedence: PRIMARY,
                signed: value.is_numeric(),
            },
            ExprFrame::Not(x) => Rendered::new(format!("NOT {}", x.operand(NOT)), NOT),
            ExprFrame::And(a, b) => Rendered::binary(a, "AND", b, AND, AND, AND + 1),
            ExprFrame::Or(a, b) => Rendered::binary(a, "OR", b, OR, OR, OR + 1),
            ExprFrame::Comparison(op, a, b) => {
                Rendered::binary(a, op.symbol(), b, CONDITION, ADDITIVE, ADDITIVE)
            }
            ExprFrame::Arithmetic(op, a, b) => {
                let level = if op.is_multiplicative() {
                    MULTIPLICATIVE
                } else {
                    ADDITIVE
                };
                Rendered::binary(a, op.symbol(), b, level, level, level + 1)
            }
            ExprFrame::Unary(op, x) => {
                let mut text = op.symbol().to_string();
                // `- -5`, not `--5`
                if x.signed {
                    text.push(' ');
                }
                text.push_str(&x.operand(UNARY));
                Rendered {
                    text,
                    precedence: UNARY,
                    signed: true,
                }
            }
            ExprFrame::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let mut text = operand.operand(ADDITIVE);
                text.push(' ');
                text.push_str(not_keyword(negated));
                text.push_str("BETWEEN ");
                text.push_str(&low.operand(ADDITIVE));
                text.push_str(" AND ");
                text.push_str(&high.operand(ADDITIVE));
                Rendered::new(text, CONDITION)
            }
            ExprFrame::In {
                operand,
                list,
                negated,
            } => Rendered::new(
                format!("{} {}IN {}", operand.operand(ADDITIVE), not_keyword(negated), list),
                CONDITION,
            ),
            ExprFrame::Like {
                operand,
                pattern,
                negated,
            } => Rendered::new(
                format!("{} {}LIKE {}", operand.operand(ADDITIVE), not_keyword(negated), pattern),
                CONDITION,
            ),
            ExprFrame::IsNull { operand, negated } => Rendered::new(
                format!("{} IS {}NULL", operand.operand(ADDITIVE), not_keyword(negated)),
                CONDITION,
            ),
        });
        rendered.text
    }
}

/// Canonical rendering: upper-case keywords and the fewest parentheses that
/// preserve the tree's shape when parsed back.
impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
