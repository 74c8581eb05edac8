use pest::{
    iterators::Pair,
    pratt_parser::{Assoc::*, Op, PrattParser},
    Parser,
};
use pest_derive::Parser;

use super::error::{SelectorError, SpanExt};
use crate::expr::{Expr, StringLiteralList};
use crate::like::LikePattern;
use crate::operator::{ArithmeticOp, ComparisonOp, UnaryOp};
use crate::value::Value;

/// Deepest run of parentheses and prefix operators (`NOT`, signs) accepted.
///
/// Both are parsed recursively; `AND`/`OR` chains of any length are not.
pub const MAX_NESTING: usize = 32;

const I64_MIN_MAGNITUDE: u64 = 1 << 63;

/// Value of an unsigned decimal or hex integer literal, with any `L` suffix
fn integer_magnitude(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(['l', 'L']);
    match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}

/// Reject selectors that nest deeper than [`MAX_NESTING`] before handing
/// them to the recursive parser.
fn check_nesting(input: &str) -> Result<(), SelectorError> {
    const OPERATOR_WORDS: [&str; 7] = ["and", "or", "between", "like", "in", "is", "escape"];

    // depth inside each open parenthesis
    let mut open: Vec<usize> = Vec::new();
    // prefix operators since the last operand
    let mut prefixes = 0;
    // a sign right after an operand is binary
    let mut after_operand = false;
    let mut chars = input.char_indices().peekable();

    while let Some((at, c)) = chars.next() {
        let depth = open.last().copied().unwrap_or(0) + prefixes;
        match c {
            '\'' => {
                while let Some((_, c)) = chars.next() {
                    if c == '\'' && chars.next_if(|&(_, c)| c == '\'').is_none() {
                        break;
                    }
                }
                prefixes = 0;
                after_operand = true;
            }
            '(' => {
                open.push(depth + 1);
                prefixes = 0;
                after_operand = false;
            }
            ')' => {
                open.pop();
                prefixes = 0;
                after_operand = true;
            }
            '+' | '-' if !after_operand => prefixes += 1,
            c if is_word_char(c) => {
                let mut end = at + c.len_utf8();
                while let Some((i, c)) = chars.next_if(|&(_, c)| is_word_char(c)) {
                    end = i + c.len_utf8();
                }
                let word = &input[at..end];
                if word.eq_ignore_ascii_case("not") {
                    prefixes += 1;
                    after_operand = false;
                } else {
                    prefixes = 0;
                    after_operand = !OPERATOR_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w));
                }
            }
            c if c.is_whitespace() => {}
            _ => {
                prefixes = 0;
                after_operand = false;
            }
        }

        if open.last().copied().unwrap_or(0) + prefixes > MAX_NESTING {
            return Err(SelectorError::NestingTooDeep {
                limit: MAX_NESTING,
                span: (at, c.len_utf8()).into(),
                src: String::new(),
            });
        }
    }
    Ok(())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
pub struct SelectorParser;

impl SelectorParser {
    /// Compile selector text into an expression tree.
    ///
    /// Returns `Ok(None)` for empty or whitespace-only input, which selects every message.
    pub fn parse_selector(input: &str) -> Result<Option<Expr>, SelectorError> {
        Self::parse_program(input).map_err(|e| e.with_source(input.to_string()))
    }

    fn parse_program(input: &str) -> Result<Option<Expr>, SelectorError> {
        check_nesting(input)?;
        let mut pairs = Self::parse(Rule::program, input)
            .map_err(|e| SelectorError::from_pest(Box::new(e), input.to_string()))?;

        let program_pair = pairs
            .next()
            .ok_or_else(|| SelectorError::internal("Grammar guarantees program exists"))?;

        match program_pair.into_inner().next() {
            Some(pair) if pair.as_rule() == Rule::expr => Self::parse_expr(pair).map(Some),
            // only EOI: nothing to filter on
            _ => Ok(None),
        }
    }

    fn parse_expr(pair: Pair<'_, Rule>) -> Result<Expr, SelectorError> {
        let pratt = PrattParser::new()
            .op(Op::infix(Rule::or, Left))
            .op(Op::infix(Rule::and, Left))
            .op(Op::prefix(Rule::neg));

        pratt
            .map_primary(Self::parse_condition)
            .map_infix(Self::parse_infix)
            .map_prefix(Self::parse_prefix)
            .parse(pair.into_inner())
    }

    fn parse_infix(
        lhs: Result<Expr, SelectorError>,
        pair: Pair<'_, Rule>,
        rhs: Result<Expr, SelectorError>,
    ) -> Result<Expr, SelectorError> {
        match pair.as_rule() {
            Rule::and => Ok(Expr::and(lhs?, rhs?)),
            Rule::or => Ok(Expr::or(lhs?, rhs?)),
            rule => Err(SelectorError::internal(format!(
                "Unexpected infix rule: {:?}",
                rule
            ))),
        }
    }

    fn parse_prefix(
        pair: Pair<'_, Rule>,
        rhs: Result<Expr, SelectorError>,
    ) -> Result<Expr, SelectorError> {
        match pair.as_rule() {
            Rule::neg => Ok(Expr::not(rhs?)),
            rule => Err(SelectorError::internal(format!(
                "Unexpected prefix rule: {:?}",
                rule
            ))),
        }
    }

    fn parse_condition(pair: Pair<'_, Rule>) -> Result<Expr, SelectorError> {
        if pair.as_rule() != Rule::condition {
            return Err(SelectorError::internal(format!(
                "Unexpected primary rule: {:?}",
                pair.as_rule()
            )));
        }

        let mut inner = pair.into_inner();
        let operand_pair = inner
            .next()
            .ok_or_else(|| SelectorError::internal("Grammar guarantees condition has operand"))?;
        let operand_span = operand_pair.as_span();
        let operand = Self::parse_sum(operand_pair)?;

        let Some(tail) = inner.next() else {
            return Ok(operand);
        };

        let negated = tail.clone().into_inner().any(|p| p.as_rule() == Rule::not_kw);
        if let Some(open) = tail
            .clone()
            .into_inner()
            .find(|p| p.as_rule() == Rule::unterminated_string)
        {
            return Err(Self::unterminated(&open));
        }

        match tail.as_rule() {
            Rule::comparison => {
                let mut parts = tail.into_inner();
                let op_pair = parts.next().ok_or_else(|| {
                    SelectorError::internal("Grammar guarantees comparison has operator")
                })?;
                let op = ComparisonOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
                    SelectorError::internal(format!("Unknown comparison: {}", op_pair.as_str()))
                })?;
                let rhs = parts.next().ok_or_else(|| {
                    SelectorError::internal("Grammar guarantees comparison has operand")
                })?;
                Ok(Expr::compare(op, operand, Self::parse_sum(rhs)?))
            }
            Rule::between => {
                let mut bounds = tail.into_inner().filter(|p| p.as_rule() == Rule::sum);
                let (Some(low), Some(high)) = (bounds.next(), bounds.next()) else {
                    return Err(SelectorError::internal(
                        "Grammar guarantees between has two bounds",
                    ));
                };
                Ok(Expr::between(
                    operand,
                    Self::parse_sum(low)?,
                    Self::parse_sum(high)?,
                    negated,
                ))
            }
            Rule::in_list => {
                Self::require_identifier(&operand, operand_span, "IN")?;
                let items = tail
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::string_literal)
                    .map(Self::unquote)
                    .collect();
                Ok(Expr::In {
                    operand: Box::new(operand),
                    list: StringLiteralList(items),
                    negated,
                })
            }
            Rule::like => {
                Self::require_identifier(&operand, operand_span, "LIKE")?;
                let mut literals = tail
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::string_literal);
                let pattern_pair = literals.next().ok_or_else(|| {
                    SelectorError::internal("Grammar guarantees like has a pattern")
                })?;
                let escape_pair = literals.next();

                let pattern = Self::unquote(pattern_pair.clone());
                let escape = escape_pair.clone().map(Self::unquote);
                let compiled = LikePattern::new(&pattern, escape.as_deref()).map_err(|e| {
                    // point at the ESCAPE literal when that is what's wrong with it
                    let span = match (&e, escape_pair) {
                        (crate::like::LikePatternError::EscapeLength(_), Some(p)) => p.as_span(),
                        _ => pattern_pair.as_span(),
                    };
                    SelectorError::from_like(e, span.to_source_span())
                })?;
                Ok(Expr::like(operand, compiled, negated))
            }
            Rule::is_null => {
                Self::require_identifier(&operand, operand_span, "IS NULL")?;
                Ok(Expr::is_null(operand, negated))
            }
            rule => Err(SelectorError::internal(format!(
                "Unexpected condition rule: {:?}",
                rule
            ))),
        }
    }

    fn require_identifier(
        operand: &Expr,
        span: pest::Span<'_>,
        operator: &str,
    ) -> Result<(), SelectorError> {
        match operand {
            Expr::Identifier(_) => Ok(()),
            _ => {
                // the operand's span runs on through any trailing whitespace
                let found = span.as_str().trim_end();
                Err(SelectorError::IdentifierRequired {
                    operator: operator.to_string(),
                    found: found.to_string(),
                    span: (span.start(), found.len()).into(),
                    src: String::new(),
                })
            }
        }
    }

    fn parse_sum(pair: Pair<'_, Rule>) -> Result<Expr, SelectorError> {
        let pratt = PrattParser::new()
            .op(Op::infix(Rule::add, Left) | Op::infix(Rule::subtract, Left))
            .op(Op::infix(Rule::multiply, Left) | Op::infix(Rule::divide, Left))
            .op(Op::prefix(Rule::plus) | Op::prefix(Rule::minus));

        pratt
            .map_primary(Self::parse_primary)
            .map_infix(Self::parse_arithmetic)
            .map_prefix(Self::parse_sign)
            .parse(pair.into_inner())
    }

    fn parse_arithmetic(
        lhs: Result<Expr, SelectorError>,
        pair: Pair<'_, Rule>,
        rhs: Result<Expr, SelectorError>,
    ) -> Result<Expr, SelectorError> {
        let op = match pair.as_rule() {
            Rule::add => ArithmeticOp::Add,
            Rule::subtract => ArithmeticOp::Subtract,
            Rule::multiply => ArithmeticOp::Multiply,
            Rule::divide => ArithmeticOp::Divide,
            rule => {
                return Err(SelectorError::internal(format!(
                    "Unexpected arithmetic rule: {:?}",
                    rule
                )))
            }
        };
        Ok(Expr::arithmetic(op, lhs?, rhs?))
    }

    /// Signs applied straight to a numeric literal fold into the literal,
    /// so `a = -5` remains a plain equality.
    fn parse_sign(
        pair: Pair<'_, Rule>,
        rhs: Result<Expr, SelectorError>,
    ) -> Result<Expr, SelectorError> {
        let op = match pair.as_rule() {
            Rule::plus => UnaryOp::Plus,
            Rule::minus => UnaryOp::Minus,
            rule => {
                return Err(SelectorError::internal(format!(
                    "Unexpected prefix rule: {:?}",
                    rule
                )))
            }
        };

        let operand = match rhs {
            // 9223372036854775808 only fits once negated
            Err(SelectorError::NumberOutOfRange { literal, span, .. })
                if op == UnaryOp::Minus
                    && Self::directly_follows(&pair, span.offset())
                    && integer_magnitude(&literal) == Some(I64_MIN_MAGNITUDE) =>
            {
                return Ok(Expr::Literal(Value::Integer(i64::MIN)));
            }
            rhs => rhs?,
        };

        let folded = match (op, operand.as_literal()) {
            (UnaryOp::Plus, Some(v)) if v.is_numeric() => Some(v.clone()),
            (UnaryOp::Minus, Some(v)) if v.is_numeric() => v.negate(),
            _ => None,
        };
        Ok(match folded {
            Some(v) => Expr::Literal(v),
            None => Expr::unary(op, operand),
        })
    }

    /// True when only whitespace separates `sign` from the text at `offset`
    fn directly_follows(sign: &Pair<'_, Rule>, offset: usize) -> bool {
        sign.get_input()
            .get(sign.as_span().end()..offset)
            .is_some_and(|gap| gap.trim().is_empty())
    }

    fn parse_primary(pair: Pair<'_, Rule>) -> Result<Expr, SelectorError> {
        match pair.as_rule() {
            Rule::expr => Self::parse_expr(pair),
            Rule::identifier => Ok(Expr::Identifier(pair.as_str().to_string())),
            Rule::string_literal => Ok(Expr::Literal(Value::String(Self::unquote(pair)))),
            Rule::unterminated_string => Err(Self::unterminated(&pair)),
            Rule::integer_literal => Self::parse_integer(pair),
            Rule::float_literal => Self::parse_float(pair),
            Rule::boolean_literal => Ok(Expr::Literal(Value::Boolean(
                pair.as_str().eq_ignore_ascii_case("true"),
            ))),
            rule => Err(SelectorError::internal(format!(
                "Unexpected primary rule: {:?}",
                rule
            ))),
        }
    }

    fn parse_integer(pair: Pair<'_, Rule>) -> Result<Expr, SelectorError> {
        integer_magnitude(pair.as_str())
            .and_then(|m| i64::try_from(m).ok())
            .map(|i| Expr::Literal(Value::Integer(i)))
            .ok_or_else(|| Self::out_of_range(&pair))
    }

    fn parse_float(pair: Pair<'_, Rule>) -> Result<Expr, SelectorError> {
        let digits = pair.as_str().trim_end_matches(['f', 'F', 'd', 'D']);
        match digits.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Expr::Literal(Value::Float(f))),
            _ => Err(Self::out_of_range(&pair)),
        }
    }

    fn unterminated(pair: &Pair<'_, Rule>) -> SelectorError {
        SelectorError::UnterminatedString {
            span: pair.as_span().to_source_span(),
            src: String::new(),
        }
    }

    fn out_of_range(pair: &Pair<'_, Rule>) -> SelectorError {
        SelectorError::NumberOutOfRange {
            literal: pair.as_str().to_string(),
            span: pair.as_span().to_source_span(),
            src: String::new(),
        }
    }

    /// Contents of a string literal with `''` collapsed to `'`
    fn unquote(pair: Pair<'_, Rule>) -> String {
        pair.into_inner()
            .next()
            .map(|inner| inner.as_str().replace("''", "'"))
            .unwrap_or_default()
    }
}
