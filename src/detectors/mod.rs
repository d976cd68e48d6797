//! Built-in cleanup detectors.
//!
//! A detector inspects one compilation unit (its tree, its compiler
//! diagnostics, or both) and records [`RewriteOperation`]s. It never touches
//! text offsets directly; operations resolve their nodes when the aggregator
//! asks them to contribute.

mod boolean;
mod imports;
mod statements;

use crate::config::DetectorOptions;
use crate::diagnostics::ProblemRecord;
use crate::rewrite::{RewriteError, RewriteOperation};
use crate::tree::ParseTree;
use std::fmt;

/// How much of a tree a detector needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TreeRequirement {
    /// Works from text and diagnostics alone
    None,
    /// Reads the tree parsed once for the unit
    Shared,
    /// Needs a tree reflecting edits made by the other detectors, so it
    /// runs in a second round against a reparse
    Fresh,
}

/// Everything a detector may look at for one unit.
pub struct ScanInput<'a> {
    pub text: &'a str,
    pub tree: Option<&'a ParseTree>,
    pub diagnostics: &'a [ProblemRecord],
    pub options: &'a DetectorOptions,
    /// Edit-group label for this detector's operations
    pub label: &'a str,
}

impl<'a> ScanInput<'a> {
    /// The tree, or [`RewriteError::MissingTree`] if none was built.
    pub fn tree(&self) -> Result<&'a ParseTree, RewriteError> {
        self.tree.ok_or_else(|| RewriteError::MissingTree {
            label: self.label.to_string(),
        })
    }
}

pub type Operations = Vec<Box<dyn RewriteOperation>>;

pub trait Detector: Send + Sync {
    /// Stable id used in configuration.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Default edit-group label, overridable via `[messages]`.
    fn default_message(&self) -> &str;

    fn tree_requirement(&self, options: &DetectorOptions) -> TreeRequirement;

    fn scan(&self, input: &ScanInput<'_>, out: &mut Operations) -> Result<(), RewriteError>;
}

type ScanFn = fn(&ScanInput<'_>, &mut Operations) -> Result<(), RewriteError>;

struct DetectorEntry {
    id: &'static str,
    description: &'static str,
    message: &'static str,
    requirement: TreeRequirement,
    scan: ScanFn,
}

/// The detectors shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetectorKind {
    BooleanComparison,
    DoubleNegation,
    EmptyStatement,
    NegatedIfElse,
    UnusedImport,
}

// Indexed by `DetectorKind as usize`.
const TABLE: [DetectorEntry; 5] = [
    DetectorEntry {
        id: "boolean_comparison",
        description: "Replace comparisons with boolean literals by the operand itself",
        message: "Remove comparison with boolean literal",
        requirement: TreeRequirement::Shared,
        scan: boolean::scan_comparisons,
    },
    DetectorEntry {
        id: "double_negation",
        description: "Remove `!!` pairs",
        message: "Remove double negation",
        requirement: TreeRequirement::Shared,
        scan: boolean::scan_double_negations,
    },
    DetectorEntry {
        id: "empty_statement",
        description: "Remove stray `;` statements inside blocks",
        message: "Remove empty statement",
        requirement: TreeRequirement::Shared,
        scan: statements::scan_empty_statements,
    },
    DetectorEntry {
        id: "negated_if_else",
        description: "Invert `if !c { A } else { B }` into `if c { B } else { A }`",
        message: "Invert negated if/else",
        requirement: TreeRequirement::Fresh,
        scan: statements::scan_negated_if_else,
    },
    DetectorEntry {
        id: "unused_import",
        description: "Remove imports the compiler reports as unused",
        message: "Remove unused import",
        requirement: TreeRequirement::None,
        scan: imports::scan_unused_imports,
    },
];

impl DetectorKind {
    pub const ALL: [DetectorKind; 5] = [
        DetectorKind::BooleanComparison,
        DetectorKind::DoubleNegation,
        DetectorKind::EmptyStatement,
        DetectorKind::NegatedIfElse,
        DetectorKind::UnusedImport,
    ];

    fn entry(self) -> &'static DetectorEntry {
        &TABLE[self as usize]
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.entry().id == id)
    }

    pub fn ids() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(|kind| kind.entry().id)
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry().id)
    }
}

impl Detector for DetectorKind {
    fn id(&self) -> &str {
        self.entry().id
    }

    fn description(&self) -> &str {
        self.entry().description
    }

    fn default_message(&self) -> &str {
        self.entry().message
    }

    fn tree_requirement(&self, _options: &DetectorOptions) -> TreeRequirement {
        self.entry().requirement
    }

    fn scan(&self, input: &ScanInput<'_>, out: &mut Operations) -> Result<(), RewriteError> {
        (self.entry().scan)(input, out)
    }
}
