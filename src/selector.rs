use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use slog::{debug, o, Discard, FnValue, Logger, Record};

use crate::eval::PropertySource;
use crate::expr::Expr;
use crate::index_key::{extract_indexable_keys, IndexableKeys};
use crate::parser::{parse_selector, SelectorError};
use crate::tristate::TriState;

/// A compiled message selector, immutable once built.
///
/// Holds no tree when the selector text was empty; such a selector matches
/// every message.
#[derive(Clone)]
pub struct Selector {
    expr: Option<Arc<Expr>>,
    logger: Logger,
}

impl Selector {
    /// Compile selector text, failing on any syntax error.
    pub fn new(source: &str) -> Result<Self, SelectorError> {
        Self::with_logger(source, &Logger::root(Discard, o!()))
    }

    pub fn with_logger(source: &str, logger: &Logger) -> Result<Self, SelectorError> {
        let expr = parse_selector(source)?.map(Arc::new);
        let logger = match &expr {
            // rendered only when a record is actually emitted
            Some(e) => {
                let e = Arc::clone(e);
                logger.new(o!("selector" => FnValue(move |_: &Record| e.to_string())))
            }
            None => logger.new(o!("selector" => "")),
        };
        debug!(logger, "compiled selector"; "absent" => expr.is_none());
        Ok(Selector { expr, logger })
    }

    /// Selector without an expression
    pub fn match_all() -> Self {
        Selector {
            expr: None,
            logger: Logger::root(Discard, o!()),
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_deref()
    }

    /// Three-valued result; an absent selector is always `True`.
    pub fn evaluate<P: PropertySource + ?Sized>(&self, props: &P) -> TriState {
        match &self.expr {
            Some(e) => e.evaluate_boolean(props),
            None => TriState::True,
        }
    }

    /// Both `False` and `Unknown` mean the message is not delivered.
    pub fn matches<P: PropertySource + ?Sized>(&self, props: &P) -> bool {
        let result = self.evaluate(props);
        debug!(self.logger, "evaluated selector"; "result" => %result);
        result.is_true()
    }

    pub fn indexable_keys(&self) -> IndexableKeys {
        match &self.expr {
            None => IndexableKeys::MatchAll,
            Some(e) => {
                let keys = extract_indexable_keys(e);
                debug!(self.logger, "extracted index keys"; "count" => keys.len());
                IndexableKeys::Keys(keys)
            }
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::new(s)
    }
}

/// Canonical form of the selector; empty when absent.
impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            Some(e) => write!(f, "{}", e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("expr", &self.to_string())
            .finish()
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}
