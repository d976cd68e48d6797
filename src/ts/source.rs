//! The parser seam used by the cleanup driver.

use crate::pool;
use crate::tree::ParseTree;
use crate::ts::errors::ParseError;
use crate::ts::parser::RustEdition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compiler settings a parser may need, e.g. `edition = "2021"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions {
    values: BTreeMap<String, String>,
}

impl CompilerOptions {
    pub const EDITION: &'static str = "edition";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Configured edition, defaulting to 2021.
    pub fn edition(&self) -> Result<RustEdition, ParseError> {
        match self.get(Self::EDITION) {
            None => Ok(RustEdition::default()),
            Some(value) => {
                RustEdition::parse(value).ok_or_else(|| ParseError::UnsupportedEdition {
                    value: value.to_string(),
                })
            }
        }
    }
}

/// Turns source text into an immutable [`ParseTree`].
pub trait SourceParser: Send + Sync {
    fn parse(&self, text: &str, options: &CompilerOptions) -> Result<ParseTree, ParseError>;
}

/// Tree-sitter Rust parser drawn from the thread-local pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustSourceParser;

impl SourceParser for RustSourceParser {
    fn parse(&self, text: &str, options: &CompilerOptions) -> Result<ParseTree, ParseError> {
        let edition = options.edition()?;
        pool::with_parser(|parser| {
            parser.set_edition(edition);
            parser.parse(text)
        })?
    }
}
