use recursion::{Collapsible, MappableFrame, PartiallyApplied};

use super::{Expr, StringLiteralList};
use crate::like::LikePattern;
use crate::operator::{ArithmeticOp, ComparisonOp, UnaryOp};
use crate::value::Value;

/// short-lived single layer of a borrowed selector expression, used for
/// running recursive algorithms over a heap stack instead of the call stack
#[derive(Debug, PartialEq)]
pub enum ExprFrame<'a, X> {
    // leaves
    Identifier(&'a str),
    Literal(&'a Value),
    // boolean connectives
    Not(X),
    And(X, X),
    Or(X, X),
    Comparison(ComparisonOp, X, X),
    Arithmetic(ArithmeticOp, X, X),
    Unary(UnaryOp, X),
    Between {
        operand: X,
        low: X,
        high: X,
        negated: bool,
    },
    In {
        operand: X,
        list: &'a StringLiteralList,
        negated: bool,
    },
    Like {
        operand: X,
        pattern: &'a LikePattern,
        negated: bool,
    },
    IsNull {
        operand: X,
        negated: bool,
    },
}

impl<'a> MappableFrame for ExprFrame<'a, PartiallyApplied> {
    type Frame<X> = ExprFrame<'a, X>;

    fn map_frame<A, B>(input: Self::Frame<A>, mut f: impl FnMut(A) -> B) -> Self::Frame<B> {
        use ExprFrame::*;
        match input {
            Identifier(name) => Identifier(name),
            Literal(value) => Literal(value),
            Not(a) => Not(f(a)),
            And(a, b) => And(f(a), f(b)),
            Or(a, b) => Or(f(a), f(b)),
            Comparison(op, a, b) => Comparison(op, f(a), f(b)),
            Arithmetic(op, a, b) => Arithmetic(op, f(a), f(b)),
            Unary(op, a) => Unary(op, f(a)),
            Between {
                operand,
                low,
                high,
                negated,
            } => Between {
                operand: f(operand),
                low: f(low),
                high: f(high),
                negated,
            },
            In {
                operand,
                list,
                negated,
            } => In {
                operand: f(operand),
                list,
                negated,
            },
            Like {
                operand,
                pattern,
                negated,
            } => Like {
                operand: f(operand),
                pattern,
                negated,
            },
            IsNull { operand, negated } => IsNull {
                operand: f(operand),
                negated,
            },
        }
    }
}

impl<'a, X> ExprFrame<'a, X> {
    /// Separate a layer into its shape and its children, in source order.
    pub fn split(self) -> (ExprFrame<'a, ()>, Vec<X>) {
        let mut children = Vec::new();
        let shape = <ExprFrame<'a, PartiallyApplied> as MappableFrame>::map_frame(self, |child| {
            children.push(child)
        });
        (shape, children)
    }
}

impl<'a> Collapsible for &'a Expr {
    type FrameToken = ExprFrame<'a, PartiallyApplied>;

    fn into_frame(self) -> ExprFrame<'a, Self> {
        match self {
            Expr::Identifier(name) => ExprFrame::Identifier(name),
            Expr::Literal(value) => ExprFrame::Literal(value),
            Expr::Not(x) => ExprFrame::Not(x.as_ref()),
            Expr::And(a, b) => ExprFrame::And(a.as_ref(), b.as_ref()),
            Expr::Or(a, b) => ExprFrame::Or(a.as_ref(), b.as_ref()),
            Expr::Comparison(op, a, b) => ExprFrame::Comparison(*op, a.as_ref(), b.as_ref()),
            Expr::Arithmetic(op, a, b) => ExprFrame::Arithmetic(*op, a.as_ref(), b.as_ref()),
            Expr::Unary(op, x) => ExprFrame::Unary(*op, x.as_ref()),
            Expr::Between {
                operand,
                low,
                high,
                negated,
            } => ExprFrame::Between {
                operand: operand.as_ref(),
                low: low.as_ref(),
                high: high.as_ref(),
                negated: *negated,
            },
            Expr::In {
                operand,
                list,
                negated,
            } => ExprFrame::In {
                operand: operand.as_ref(),
                list,
                negated: *negated,
            },
            Expr::Like {
                operand,
                pattern,
                negated,
            } => ExprFrame::Like {
                operand: operand.as_ref(),
                pattern,
                negated: *negated,
            },
            Expr::IsNull { operand, negated } => ExprFrame::IsNull {
                operand: operand.as_ref(),
                negated: *negated,
            },
        }
    }
}
