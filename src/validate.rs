//! Post-apply parse validation.
//!
//! After a patch is applied the output is reparsed. If it has ERROR or
//! MISSING nodes that the input did not have, the result is rejected.
//! Errors are matched by kind and text rather than position, since every
//! edit in front of an old error shifts it.

use crate::tree::{Node, ParseTree};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Parse error introduced: found {count} new ERROR nodes")]
    ParseErrorIntroduced {
        count: usize,
        errors: Vec<ErrorLocation>,
    },
}

/// Location of an error node in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

impl ErrorLocation {
    fn of(node: Node<'_>) -> Self {
        let source = node.tree().source();
        let byte_start = node.start_byte();
        let byte_end = node.end_byte();

        let line_start = source[..byte_start].rfind('\n').map_or(0, |i| i + 1);
        let line = source[..byte_start].matches('\n').count() + 1;

        // Up to 20 bytes either side, widened to char boundaries
        let mut context_start = byte_start.saturating_sub(20);
        while !source.is_char_boundary(context_start) {
            context_start -= 1;
        }
        let mut context_end = (byte_end + 20).min(source.len());
        while !source.is_char_boundary(context_end) {
            context_end += 1;
        }

        Self {
            byte_start,
            byte_end,
            line,
            column: byte_start - line_start + 1,
            context: source[context_start..context_end].replace('\n', "\\n"),
        }
    }
}

/// Every ERROR and MISSING node in `tree`.
pub fn error_locations(tree: &ParseTree) -> Vec<ErrorLocation> {
    tree.error_nodes().map(ErrorLocation::of).collect()
}

/// Fail if `edited` has parse errors that `original` does not.
pub fn validate_edit(original: &ParseTree, edited: &ParseTree) -> Result<(), ValidationError> {
    if !edited.has_errors() {
        return Ok(());
    }

    let mut known: HashMap<(&str, &str), usize> = HashMap::new();
    for node in original.error_nodes() {
        *known.entry((node.kind(), node.text())).or_default() += 1;
    }

    let mut introduced = Vec::new();
    for node in edited.error_nodes() {
        match known.get_mut(&(node.kind(), node.text())) {
            Some(count) if *count > 0 => *count -= 1,
            _ => introduced.push(ErrorLocation::of(node)),
        }
    }

    if introduced.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::ParseErrorIntroduced {
            count: introduced.len(),
            errors: introduced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::RustParser;

    fn parse(source: &str) -> ParseTree {
        RustParser::new().unwrap().parse(source).unwrap()
    }

    fn check(original: &str, edited: &str) -> Result<(), ValidationError> {
        validate_edit(&parse(original), &parse(edited))
    }

    #[test]
    fn test_valid_source_has_no_errors() {
        assert!(error_locations(&parse("fn main() { println!(\"hello\"); }")).is_empty());
    }

    #[test]
    fn test_invalid_source_reports_location() {
        let errors = error_locations(&parse("fn main() {\n    let x = ;\n}"));
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.line == 2));
    }

    #[test]
    fn test_edit_introduces_error() {
        let result = check("fn main() { let x = 1; }", "fn main( { let x = 1; }");
        match result {
            Err(ValidationError::ParseErrorIntroduced { count, errors }) => {
                assert!(count >= 1);
                assert_eq!(errors.len(), count);
                assert_eq!(errors[0].line, 1);
            }
            other => panic!("expected a new error, got {other:?}"),
        }
    }

    #[test]
    fn test_edit_preserves_existing_error() {
        let source = "fn main( { }";
        assert!(check(source, source).is_ok());
    }

    #[test]
    fn test_shifted_error_is_not_new() {
        let original = "fn a() { let x = !!y; }\nfn broken( { }";
        let edited = "fn a() { let x = y; }\nfn broken( { }";
        assert!(check(original, edited).is_ok());
    }
}
