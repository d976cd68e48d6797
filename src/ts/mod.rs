//! Tree-sitter integration.
//!
//! Parses Rust with the grammar bundled in `ast-grep-language` and copies the
//! result into the crate's own immutable [`ParseTree`](crate::tree::ParseTree),
//! keeping every byte of comments and formatting addressable.

pub mod errors;
pub mod parser;
pub mod source;

pub use errors::ParseError;
pub use parser::{RustEdition, RustParser};
pub use source::{CompilerOptions, RustSourceParser, SourceParser};
