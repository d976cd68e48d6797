use crate::tree::{NodeSpec, ParseTree, TreeBuilder};
use crate::ts::errors::ParseError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree, TreeCursor};

/// Rust edition for grammar compatibility checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RustEdition {
    E2015,
    E2018,
    #[default]
    E2021,
    E2024,
}

impl RustEdition {
    /// Parse edition from Cargo.toml edition string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "2015" => Some(RustEdition::E2015),
            "2018" => Some(RustEdition::E2018),
            "2021" => Some(RustEdition::E2021),
            "2024" => Some(RustEdition::E2024),
            _ => None,
        }
    }
}

/// Tree-sitter parser wrapper for Rust source code.
pub struct RustParser {
    parser: Parser,
    edition: RustEdition,
}

impl RustParser {
    /// Create a new Rust parser with the default edition (2021).
    pub fn new() -> Result<Self, ParseError> {
        Self::with_edition(RustEdition::default())
    }

    /// Create a new Rust parser targeting a specific edition.
    pub fn with_edition(edition: RustEdition) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let ts_lang = SupportLang::Rust.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| ParseError::LanguageSet)?;

        Ok(Self { parser, edition })
    }

    pub fn edition(&self) -> RustEdition {
        self.edition
    }

    pub fn set_edition(&mut self, edition: RustEdition) {
        self.edition = edition;
    }

    /// Parse source code into a raw tree-sitter Tree.
    pub fn parse_raw(&mut self, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or(ParseError::ParseFailed)
    }

    /// Parse source code into an immutable [`ParseTree`] owning a copy of
    /// the text.
    pub fn parse(&mut self, source: &str) -> Result<ParseTree, ParseError> {
        let raw = self.parse_raw(source)?;
        let mut cursor = raw.walk();
        let tree = convert(source, &mut cursor);
        tree
    }
}

/// Copy a tree-sitter tree into the arena representation, preorder.
///
/// Comments are kept as leaves; their inner doc-comment structure is not
/// needed by any rewrite.
fn convert(source: &str, cursor: &mut TreeCursor<'_>) -> Result<ParseTree, ParseError> {
    let mut builder = TreeBuilder::new(source);

    'outer: loop {
        let node = cursor.node();
        let kind = node.kind();

        let mut spec = NodeSpec::new(kind, node.byte_range());
        if let Some(field) = cursor.field_name() {
            spec = spec.with_field(field);
        }
        if !node.is_named() {
            spec = spec.anonymous();
        }
        if node.is_extra() && kind.ends_with("comment") {
            spec = spec.as_comment();
        }
        if node.is_error() || node.is_missing() {
            spec = spec.as_error();
        }

        let descend = node.child_count() > 0 && !spec.comment;
        builder.push(spec, descend);
        if descend && cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                continue 'outer;
            }
            if !cursor.goto_parent() {
                break 'outer;
            }
            builder.close();
        }
    }

    Ok(builder.build()?)
}
