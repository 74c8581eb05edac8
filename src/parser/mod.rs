pub mod error;
pub mod raw;

// Re-exports for clean API
pub use error::{SelectorError, SpanExt};
pub use raw::{Rule, SelectorParser, MAX_NESTING};

use crate::expr::Expr;

/// Parse selector text; `Ok(None)` means the selector is absent and matches everything.
pub fn parse_selector(input: &str) -> Result<Option<Expr>, SelectorError> {
    SelectorParser::parse_selector(input)
}
