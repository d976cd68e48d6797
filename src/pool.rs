//! Thread-local parser pooling.
//!
//! Each worker thread creates one parser on first use and reuses it for
//! every unit it handles afterwards.

use crate::ts::{ParseError, RustParser};
use std::cell::RefCell;

thread_local! {
    static RUST_PARSER: RefCell<Option<RustParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use cleanup_patcher::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse("fn main() {}"))??;
/// assert!(!tree.has_errors());
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut RustParser) -> R,
{
    RUST_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(RustParser::new()?);
        }
        match slot.as_mut() {
            Some(parser) => Ok(f(parser)),
            None => Err(ParseError::ParserInit),
        }
    })
}
