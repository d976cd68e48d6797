use crate::tree::TreeBuildError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to initialize tree-sitter parser")]
    ParserInit,

    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("unsupported Rust edition '{value}'")]
    UnsupportedEdition { value: String },

    #[error("parser produced an inconsistent tree: {0}")]
    Tree(#[from] TreeBuildError),
}
