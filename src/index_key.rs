//! Index keys: value constraints a broker can look up instead of evaluating
//!
//! Extraction descends only through `AND`. Each non-negated `identifier = literal`
//! (either orientation) and `identifier IN (...)` found there yields a key;
//! every other shape yields nothing. The result under-approximates the
//! selector: a message can only match if, for every key, its property equals
//! one of the key's candidate values.

use std::fmt::{self, Display};

use itertools::Itertools;

use crate::expr::Expr;
use crate::operator::ComparisonOp;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SelectorIndexKey {
    property_name: String,
    candidate_values: Vec<Value>,
}

impl SelectorIndexKey {
    pub fn new(property_name: impl Into<String>, candidate_values: Vec<Value>) -> Self {
        SelectorIndexKey {
            property_name: property_name.into(),
            candidate_values,
        }
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Distinct candidate values, in the order they appear in the selector
    pub fn candidate_values(&self) -> &[Value] {
        &self.candidate_values
    }

    /// Whether a property value satisfies this key under selector equality
    /// (so `1` admits `1.0`).
    pub fn admits(&self, value: &Value) -> bool {
        self.candidate_values.iter().any(|c| c.selector_eq(value))
    }
}

impl Display for SelectorIndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {{{}}}",
            self.property_name,
            self.candidate_values.iter().join(", ")
        )
    }
}

/// What a selector offers an index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum IndexableKeys {
    /// No selector: every message matches, there is nothing to index.
    MatchAll,
    /// Keys extracted from the selector; empty when no part of it is
    /// indexable and consumers must fall back to evaluating it.
    Keys(Vec<SelectorIndexKey>),
}

impl IndexableKeys {
    pub fn keys(&self) -> &[SelectorIndexKey] {
        match self {
            IndexableKeys::MatchAll => &[],
            IndexableKeys::Keys(keys) => keys,
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, IndexableKeys::MatchAll)
    }

    /// True when at least one key was extracted
    pub fn is_indexable(&self) -> bool {
        !self.keys().is_empty()
    }
}

/// Collect index keys from the top-level conjunction of `expr`.
///
/// The same property may appear in several keys (`a = 1 AND a = 2`); keys
/// are reported as written and never intersected.
pub fn extract_indexable_keys(expr: &Expr) -> Vec<SelectorIndexKey> {
    let mut keys = Vec::new();
    // conjunctions are walked on a heap stack, right operand pushed first
    let mut pending = vec![expr];
    while let Some(expr) = pending.pop() {
        match expr {
            Expr::And(a, b) => {
                pending.push(b);
                pending.push(a);
            }
            Expr::Comparison(ComparisonOp::Equals, a, b) => match (a.as_ref(), b.as_ref()) {
                (Expr::Identifier(name), Expr::Literal(value))
                | (Expr::Literal(value), Expr::Identifier(name)) => {
                    keys.push(SelectorIndexKey::new(name.clone(), vec![value.clone()]));
                }
                _ => {}
            },
            Expr::In {
                operand,
                list,
                negated: false,
            } => {
                if let Expr::Identifier(name) = operand.as_ref() {
                    // duplicates would attribute one message to a subscription twice
                    let values = list
                        .items()
                        .iter()
                        .unique()
                        .map(|s| Value::String(s.clone()))
                        .collect();
                    keys.push(SelectorIndexKey::new(name.clone(), values));
                }
            }
            _ => {}
        }
    }
    keys
}
