use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use recursion::CollapsibleExt;

use crate::expr::frame::ExprFrame;
use crate::expr::Expr;
use crate::operator::{ComparisonOp, UnaryOp};
use crate::tristate::TriState;
use crate::value::Value;

/// Typed lookup of message headers and properties by name.
///
/// This is the only thing evaluation needs from a message: `None` means the
/// header or property is absent.
pub trait PropertySource {
    fn property(&self, name: &str) -> Option<Cow<'_, Value>>;
}

impl<S: BuildHasher> PropertySource for HashMap<String, Value, S> {
    fn property(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl PropertySource for BTreeMap<String, Value> {
    fn property(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl<T: PropertySource + ?Sized> PropertySource for &T {
    fn property(&self, name: &str) -> Option<Cow<'_, Value>> {
        (**self).property(name)
    }
}

fn compare(left: Option<&Value>, op: ComparisonOp, right: Option<&Value>) -> TriState {
    match (left, right) {
        (Some(l), Some(r)) => l.compare(op, r),
        _ => TriState::Unknown,
    }
}

fn negate_if(negated: bool, t: TriState) -> TriState {
    if negated {
        !t
    } else {
        t
    }
}

/// Truth of a scalar in boolean context: only booleans are definite.
fn truth(value: Option<&Value>) -> TriState {
    value.and_then(Value::as_bool).into()
}

/// Conditions seen as scalars: `Unknown` is NULL.
fn condition<'a>(t: TriState) -> Option<Cow<'a, Value>> {
    t.to_bool().map(|b| Cow::Owned(Value::Boolean(b)))
}

fn evaluate_frame<'a, P: PropertySource + ?Sized>(
    frame: ExprFrame<'a, Option<Cow<'a, Value>>>,
    props: &'a P,
) -> Option<Cow<'a, Value>> {
    match frame {
        ExprFrame::Identifier(name) => props.property(name),
        ExprFrame::Literal(value) => Some(Cow::Borrowed(value)),
        ExprFrame::Not(x) => condition(!truth(x.as_deref())),
        ExprFrame::And(a, b) => condition(truth(a.as_deref()) & truth(b.as_deref())),
        ExprFrame::Or(a, b) => condition(truth(a.as_deref()) | truth(b.as_deref())),
        ExprFrame::Comparison(op, a, b) => condition(compare(a.as_deref(), op, b.as_deref())),
        ExprFrame::Arithmetic(op, a, b) => {
            let (a, b) = (a?, b?);
            a.arithmetic(op, &b).map(Cow::Owned)
        }
        ExprFrame::Unary(UnaryOp::Plus, x) => x.filter(|v| v.is_numeric()),
        ExprFrame::Unary(UnaryOp::Minus, x) => x?.negate().map(Cow::Owned),
        ExprFrame::Between {
            operand,
            low,
            high,
            negated,
        } => {
            let x = operand.as_deref();
            let within = compare(x, ComparisonOp::GreaterOrEqual, low.as_deref())
                & compare(x, ComparisonOp::LessOrEqual, high.as_deref());
            condition(negate_if(negated, within))
        }
        ExprFrame::In {
            operand,
            list,
            negated,
        } => {
            let found = operand
                .as_deref()
                .and_then(Value::as_str)
                .map(|s| list.contains(s));
            condition(negate_if(negated, found.into()))
        }
        ExprFrame::Like {
            operand,
            pattern,
            negated,
        } => {
            let found = operand
                .as_deref()
                .and_then(Value::as_str)
                .map(|s| pattern.is_match(s));
            condition(negate_if(negated, found.into()))
        }
        ExprFrame::IsNull { operand, negated } => {
            condition(TriState::from(operand.is_none() != negated))
        }
    }
}

impl Expr {
    /// Evaluate in scalar context. `None` is SQL NULL: an absent property,
    /// a type mismatch, or an undefined arithmetic result. Conditions
    /// yield `Value::Boolean`, or `None` when `Unknown`.
    pub fn evaluate<'a, P: PropertySource + ?Sized>(
        &'a self,
        props: &'a P,
    ) -> Option<Cow<'a, Value>> {
        self.collapse_frames(|frame| evaluate_frame(frame, props))
    }

    /// Evaluate in boolean context with SQL92 three-valued logic.
    ///
    /// Never fails: absent properties and type mismatches yield `Unknown`.
    pub fn evaluate_boolean<P: PropertySource + ?Sized>(&self, props: &P) -> TriState {
        truth(self.evaluate(props).as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_selector;

    fn props(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn eval(selector: &str, p: &HashMap<String, Value>) -> TriState {
        parse_selector(selector)
            .unwrap()
            .expect("non-empty selector")
            .evaluate_boolean(p)
    }

    #[test]
    fn absent_identifier_is_unknown() {
        let p = props(&[]);
        assert_eq!(eval("x = 1", &p), TriState::Unknown);
        assert_eq!(eval("NOT (x = 1)", &p), TriState::Unknown);
        assert_eq!(eval("x = 1 OR 1 = 1", &p), TriState::True);
        assert_eq!(eval("x = 1 AND 1 = 2", &p), TriState::False);
    }

    #[test]
    fn boolean_identifiers_in_boolean_context() {
        let p = props(&[("flag", Value::from(true)), ("n", Value::from(1))]);
        assert_eq!(eval("flag", &p), TriState::True);
        assert_eq!(eval("NOT flag", &p), TriState::False);
        assert_eq!(eval("n", &p), TriState::Unknown);
    }

    #[test]
    fn arithmetic_results_feed_comparisons() {
        let p = props(&[("a", Value::from(6)), ("b", Value::from(1.5))]);
        assert_eq!(eval("a / 4 = 1", &p), TriState::True);
        assert_eq!(eval("a * b = 9", &p), TriState::True);
        assert_eq!(eval("-a < 0", &p), TriState::True);
        assert_eq!(eval("a / 0 = 1", &p), TriState::Unknown);
    }

    #[test]
    fn between_with_absent_bound() {
        let p = props(&[("x", Value::from(10))]);
        assert_eq!(eval("x BETWEEN 1 AND 5", &p), TriState::False);
        assert_eq!(eval("x BETWEEN y AND 5", &p), TriState::False);
        assert_eq!(eval("x BETWEEN y AND 20", &p), TriState::Unknown);
        assert_eq!(eval("x NOT BETWEEN 1 AND 5", &p), TriState::True);
    }

    #[test]
    fn in_and_like_on_non_strings_are_unknown() {
        let p = props(&[("n", Value::from(1))]);
        assert_eq!(eval("n IN ('1')", &p), TriState::Unknown);
        assert_eq!(eval("n NOT LIKE '1'", &p), TriState::Unknown);
    }

    #[test]
    fn is_null_is_definite() {
        let p = props(&[("x", Value::from("a"))]);
        assert_eq!(eval("x IS NULL", &p), TriState::False);
        assert_eq!(eval("x IS NOT NULL", &p), TriState::True);
        assert_eq!(eval("y IS NULL", &p), TriState::True);
    }

    #[test]
    fn conditions_in_scalar_context() {
        let p = props(&[("a", Value::from(1))]);
        assert_eq!(eval("(a = 1) = TRUE", &p), TriState::True);
        assert_eq!(eval("(z = 1) = TRUE", &p), TriState::Unknown);
    }
}
