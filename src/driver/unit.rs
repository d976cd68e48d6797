use crate::diagnostics::ProblemRecord;
use crate::rewrite::{EditGroup, RewriteError};
use crate::ts::{CompilerOptions, ParseError};
use crate::validate::ValidationError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One source file plus what the driver knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Display name, usually the file path
    pub name: String,
    pub text: String,
    pub diagnostics: Vec<ProblemRecord>,
    pub compiler_options: CompilerOptions,
}

impl CompilationUnit {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            diagnostics: Vec::new(),
            compiler_options: CompilerOptions::default(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<ProblemRecord>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.compiler_options = options;
        self
    }
}

/// Progress of one unit through the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    NotStarted,
    RequirementsGathered,
    TreeBuilt,
    TreeSkipped,
    OperationsCollected,
    Aggregated,
    Applied,
    Failed,
}

#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("edited output does not parse: {0}")]
    SyntaxRegression(#[from] ValidationError),
}

#[derive(Debug)]
pub enum UnitOutcome {
    Applied {
        name: String,
        text: String,
        groups: Vec<EditGroup>,
        changed: bool,
        states: Vec<UnitState>,
    },
    Failed {
        name: String,
        error: UnitError,
        states: Vec<UnitState>,
    },
}

impl UnitOutcome {
    pub fn name(&self) -> &str {
        match self {
            UnitOutcome::Applied { name, .. } | UnitOutcome::Failed { name, .. } => name,
        }
    }

    /// States visited, in order.
    pub fn states(&self) -> &[UnitState] {
        match self {
            UnitOutcome::Applied { states, .. } | UnitOutcome::Failed { states, .. } => states,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, UnitOutcome::Applied { changed: true, .. })
    }

    /// New text, if the unit was applied.
    pub fn text(&self) -> Option<&str> {
        match self {
            UnitOutcome::Applied { text, .. } => Some(text),
            UnitOutcome::Failed { .. } => None,
        }
    }

    pub fn groups(&self) -> &[EditGroup] {
        match self {
            UnitOutcome::Applied { groups, .. } => groups,
            UnitOutcome::Failed { .. } => &[],
        }
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOutcome::Applied {
                name,
                changed: false,
                ..
            } => write!(f, "{name}: no changes needed"),
            UnitOutcome::Applied { name, groups, .. } => {
                let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
                write!(f, "{name}: {}", labels.join(", "))
            }
            UnitOutcome::Failed { name, error, .. } => {
                write!(f, "cleanup could not be applied to file {name}: {error}")
            }
        }
    }
}
