//! JMS message selectors: compile the SQL92 conditional-expression subset,
//! evaluate it against message headers and properties, and derive the
//! equality constraints a broker can index subscriptions by.
//!
//! ```
//! use jms_selector::{Message, Selector};
//!
//! let selector = Selector::new("color IN ('red', 'blue') AND weight > 2.5").unwrap();
//! let message = Message::new().with_property("color", "red").with_property("weight", 3);
//! assert!(selector.matches(&message));
//! assert_eq!(selector.indexable_keys().keys()[0].property_name(), "color");
//! ```

pub mod eval;
pub mod expr;
pub mod index_key;
pub mod like;
pub mod message;
pub mod operator;
pub mod parser;
pub mod selector;
pub mod tristate;
pub mod value;

pub use eval::PropertySource;
pub use expr::{Expr, StringLiteralList};
pub use index_key::{extract_indexable_keys, IndexableKeys, SelectorIndexKey};
pub use like::LikePattern;
pub use message::{DeliveryMode, Message};
pub use operator::{ArithmeticOp, ComparisonOp, UnaryOp};
pub use parser::SelectorError;
pub use selector::Selector;
pub use tristate::TriState;
pub use value::Value;

/// Parse selector text into an expression tree; `Ok(None)` for an empty selector.
pub fn parse(s: &str) -> Result<Option<Expr>, SelectorError> {
    parser::parse_selector(s)
}
