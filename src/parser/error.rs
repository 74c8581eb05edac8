use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use super::raw::Rule;
use crate::like::LikePatternError;

/// Error raised when selector text cannot be compiled, using miette for diagnostics
///
/// Evaluation never fails; this is the only error the crate produces.
#[allow(dead_code)] // Fields are used by miette's derive macros
#[derive(Debug, Clone, Diagnostic, Error)]
pub enum SelectorError {
    // Syntax errors from pest
    #[error("Syntax error at line {line}, column {col}")]
    #[diagnostic(code(selector::syntax))]
    Syntax {
        #[source_code]
        src: String,
        #[label("{expected_msg}")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
        expected_msg: String,
        line: usize,
        col: usize,
    },

    #[error("Unterminated string literal")]
    #[diagnostic(
        code(selector::unterminated_string),
        help("String literals are closed with a single quote; write '' for a literal quote")
    )]
    UnterminatedString {
        #[label("missing closing ' quote")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("{operator} requires an identifier on its left-hand side, found: {found}")]
    #[diagnostic(
        code(selector::identifier_required),
        help("IN, LIKE and IS NULL test a header or property by name")
    )]
    IdentifierRequired {
        operator: String,
        found: String,
        #[label("expected an identifier")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Invalid ESCAPE character: {escape:?}")]
    #[diagnostic(
        code(selector::invalid_escape),
        help("ESCAPE takes a string literal holding exactly one character")
    )]
    InvalidEscape {
        escape: String,
        #[label("invalid escape")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("LIKE pattern ends with its escape character")]
    #[diagnostic(code(selector::dangling_escape))]
    DanglingEscape {
        #[label("escape sequence not completed")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Numeric literal out of range: {literal}")]
    #[diagnostic(code(selector::number_out_of_range))]
    NumberOutOfRange {
        literal: String,
        #[label("out of range")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Selector nests deeper than {limit} levels")]
    #[diagnostic(
        code(selector::nesting_too_deep),
        help("Flatten nested parentheses, NOT or sign runs; long AND/OR chains are fine")
    )]
    NestingTooDeep {
        limit: usize,
        #[label("too deep")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    // Internal errors
    #[error("Internal parser error: {message}")]
    #[diagnostic(code(selector::internal))]
    Internal {
        message: String,
        #[source_code]
        src: String,
    },
}

// Extension trait for span location extraction
pub trait SpanExt {
    fn to_location(&self) -> (usize, usize);
    fn to_source_span(&self) -> SourceSpan;
}

impl SpanExt for pest::Span<'_> {
    #[inline]
    fn to_location(&self) -> (usize, usize) {
        self.start_pos().line_col()
    }

    #[inline]
    fn to_source_span(&self) -> SourceSpan {
        (self.start(), self.end() - self.start()).into()
    }
}

/// Convert pest Rule enum to user-friendly names
fn rule_to_friendly_name(rule: &Rule) -> &'static str {
    match rule {
        Rule::program => "selector",
        Rule::expr => "expression",
        Rule::condition => "condition",
        Rule::comparison => "comparison",
        Rule::comparison_op => "comparison operator",
        Rule::between => "BETWEEN",
        Rule::in_list => "IN",
        Rule::like => "LIKE",
        Rule::is_null => "IS NULL",
        Rule::sum => "value expression",
        Rule::add | Rule::subtract | Rule::multiply | Rule::divide => "arithmetic operator",
        Rule::plus | Rule::minus => "sign",
        Rule::string_literal => "string literal",
        Rule::string_inner => "string content",
        Rule::unterminated_string => "string literal",
        Rule::float_literal => "number",
        Rule::integer_literal => "number",
        Rule::boolean_literal => "TRUE or FALSE",
        Rule::identifier => "identifier",
        Rule::or => "OR",
        Rule::and => "AND",
        Rule::neg | Rule::not_kw => "NOT",
        Rule::between_kw => "BETWEEN",
        Rule::in_kw => "IN",
        Rule::like_kw => "LIKE",
        Rule::escape_kw => "ESCAPE",
        Rule::is_kw => "IS",
        Rule::null_kw => "NULL",
        Rule::EOI => "end of input",
        _ => "token",
    }
}

/// Generate contextual help text based on error patterns
fn generate_help_text(positives: &[Rule], found_eoi: bool) -> Option<String> {
    if positives.is_empty() {
        return None;
    }

    let quoted_only = positives
        .iter()
        .all(|r| matches!(r, Rule::string_literal | Rule::unterminated_string));
    if quoted_only {
        return Some("IN lists, LIKE patterns and ESCAPE characters are quoted strings, like: color IN ('red', 'blue')".to_string());
    }

    if (positives.contains(&Rule::expr) || positives.contains(&Rule::identifier)) && found_eoi {
        return Some("Selector is incomplete. Add an operand after the operator.".to_string());
    }

    if positives.contains(&Rule::EOI) {
        return Some(
            "Unexpected input. Check for unbalanced parentheses or a misspelled keyword."
                .to_string(),
        );
    }

    None
}

impl SelectorError {
    /// Create a syntax error from pest error with diagnostic information
    pub fn from_pest(pest_err: Box<pest::error::Error<Rule>>, src: String) -> Self {
        use pest::error::{ErrorVariant, InputLocation};

        // Extract position information with non-zero width for miette arrow rendering
        let span = match pest_err.location {
            InputLocation::Pos(pos) => {
                // If at/past EOI, point backwards at last char; otherwise point at current position
                if pos >= src.len() && pos > 0 {
                    (pos - 1, 1).into()
                } else if pos < src.len() {
                    (pos, 1).into()
                } else {
                    (0, 0).into()
                }
            }
            InputLocation::Span((start, end)) => {
                let width = end.saturating_sub(start).max(1);
                (start, width).into()
            }
        };

        let (line, col) = match pest_err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };

        let (expected_msg, help) = match &pest_err.variant {
            ErrorVariant::ParsingError {
                positives,
                negatives: _,
            } => {
                let found_eoi = match pest_err.location {
                    InputLocation::Pos(p) => p >= src.len(),
                    InputLocation::Span((_, end)) => end >= src.len(),
                };

                let mut names: Vec<&str> = positives.iter().map(rule_to_friendly_name).collect();
                names.dedup();

                let expected_msg = match names.as_slice() {
                    [] => "Unexpected input".to_string(),
                    [name] => format!("Expected {}", name),
                    names if names.len() <= 3 => format!("Expected one of: {}", names.join(", ")),
                    names => format!("Expected one of: {}, ...", names[..3].join(", ")),
                };

                (expected_msg, generate_help_text(positives, found_eoi))
            }
            ErrorVariant::CustomError { message } => (message.clone(), None),
        };

        SelectorError::Syntax {
            src,
            span,
            help,
            expected_msg,
            line,
            col,
        }
    }

    pub(crate) fn from_like(err: LikePatternError, span: SourceSpan) -> Self {
        match err {
            LikePatternError::EscapeLength(escape) => SelectorError::InvalidEscape {
                escape,
                span,
                src: String::new(),
            },
            LikePatternError::DanglingEscape => SelectorError::DanglingEscape {
                span,
                src: String::new(),
            },
            LikePatternError::Regex(e) => SelectorError::internal(e.to_string()),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        SelectorError::Internal {
            message: msg.into(),
            src: String::new(),
        }
    }

    /// Add source code to the error
    pub fn with_source(mut self, src: String) -> Self {
        match &mut self {
            SelectorError::Syntax { src: s, .. }
            | SelectorError::UnterminatedString { src: s, .. }
            | SelectorError::IdentifierRequired { src: s, .. }
            | SelectorError::InvalidEscape { src: s, .. }
            | SelectorError::DanglingEscape { src: s, .. }
            | SelectorError::NumberOutOfRange { src: s, .. }
            | SelectorError::NestingTooDeep { src: s, .. }
            | SelectorError::Internal { src: s, .. } => {
                *s = src;
            }
        }
        self
    }

    /// Byte offset of the offending text, when the error has one
    pub fn offset(&self) -> Option<usize> {
        match self {
            SelectorError::Syntax { span, .. }
            | SelectorError::UnterminatedString { span, .. }
            | SelectorError::IdentifierRequired { span, .. }
            | SelectorError::InvalidEscape { span, .. }
            | SelectorError::DanglingEscape { span, .. }
            | SelectorError::NumberOutOfRange { span, .. }
            | SelectorError::NestingTooDeep { span, .. } => Some(span.offset()),
            SelectorError::Internal { .. } => None,
        }
    }
}
