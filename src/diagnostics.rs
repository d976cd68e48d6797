//! Compiler problem records.
//!
//! Detectors that do not need a tree (e.g. unused imports) work from the
//! compiler's own findings. Records are usually read from
//! `cargo check --message-format=json` output.

use cargo_metadata::diagnostic::{
    Applicability, Diagnostic as CargoDiagnostic, DiagnosticLevel, DiagnosticSpan,
};
use cargo_metadata::Message;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl From<&DiagnosticLevel> for Severity {
    fn from(level: &DiagnosticLevel) -> Self {
        match level {
            DiagnosticLevel::Error | DiagnosticLevel::Ice => Severity::Error,
            DiagnosticLevel::Warning => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// One problem reported against a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemRecord {
    /// Lint or error code, e.g. `unused_imports` or `E0599`
    pub kind: String,
    pub byte_start: usize,
    pub byte_end: usize,
    pub severity: Severity,
    /// Source text at the reported span(s)
    pub arguments: Vec<String>,
    /// Machine-applicable replacement for `[byte_start, byte_end)`, if the
    /// compiler offered one
    pub replacement: Option<String>,
}

impl ProblemRecord {
    pub fn new(kind: impl Into<String>, range: Range<usize>, severity: Severity) -> Self {
        Self {
            kind: kind.into(),
            byte_start: range.start,
            byte_end: range.end,
            severity,
            arguments: Vec::new(),
            replacement: None,
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    pub fn range(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }
}

#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problem records keyed by the file they belong to.
pub type ProblemsByFile = BTreeMap<PathBuf, Vec<ProblemRecord>>;

/// Convert one cargo diagnostic into records, keyed by file.
///
/// Machine-applicable suggestions become one record each, carrying the
/// replacement. Diagnostics without one yield a record per primary span.
pub fn from_cargo(diag: &CargoDiagnostic, workspace_root: &Path) -> Vec<(PathBuf, ProblemRecord)> {
    let Some(code) = diag.code.as_ref().map(|c| c.code.clone()) else {
        return Vec::new();
    };
    let severity = Severity::from(&diag.level);

    let arguments: Vec<String> = diag
        .spans
        .iter()
        .filter(|span| span.is_primary)
        .filter_map(|span| span.text.first())
        .map(|line| {
            let start = line.highlight_start.saturating_sub(1);
            let end = line.highlight_end.saturating_sub(1);
            line.text.get(start..end).unwrap_or(&line.text).to_string()
        })
        .collect();

    let mut suggestions = Vec::new();
    collect_suggestions(diag, &mut suggestions);

    let mut records = Vec::new();
    if suggestions.is_empty() {
        for span in diag.spans.iter().filter(|span| span.is_primary) {
            if let Some(file) = resolve_file(span, workspace_root) {
                let record = ProblemRecord {
                    arguments: arguments.clone(),
                    ..ProblemRecord::new(code.clone(), span_range(span), severity)
                };
                records.push((file, record));
            }
        }
    } else {
        for (span, replacement) in suggestions {
            if let Some(file) = resolve_file(span, workspace_root) {
                let record = ProblemRecord {
                    arguments: arguments.clone(),
                    ..ProblemRecord::new(code.clone(), span_range(span), severity)
                }
                .with_replacement(replacement);
                records.push((file, record));
            }
        }
    }

    records
}

/// Parse cargo JSON output (one message per line) into records for every
/// file under `workspace`.
pub fn parse_cargo_output<R: BufRead>(
    reader: R,
    workspace: &Path,
) -> Result<ProblemsByFile, DiagnosticError> {
    let mut problems = ProblemsByFile::new();

    for line in reader.lines() {
        let line = line?;

        // Proc macros can print non-JSON lines
        if !line.starts_with('{') {
            continue;
        }

        let message: Message = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(_) => continue,
        };

        if let Message::CompilerMessage(msg) = message {
            for (file, record) in from_cargo(&msg.message, workspace) {
                problems.entry(file).or_default().push(record);
            }
        }
    }

    for records in problems.values_mut() {
        records.sort_by_key(|record| (record.byte_start, record.byte_end));
        records.dedup();
    }

    Ok(problems)
}

fn span_range(span: &DiagnosticSpan) -> Range<usize> {
    span.byte_start as usize..span.byte_end as usize
}

fn resolve_file(span: &DiagnosticSpan, workspace_root: &Path) -> Option<PathBuf> {
    let file_path = Path::new(&span.file_name);
    let file = if file_path.is_absolute() {
        file_path.to_path_buf()
    } else {
        workspace_root.join(file_path)
    };

    // Skip stdlib, dependencies and macro expansions
    if !file.starts_with(workspace_root)
        || span.file_name.contains("target/")
        || span.file_name.contains(".cargo/registry")
        || span.file_name.contains(".rustup")
        || span.expansion.is_some()
    {
        return None;
    }

    Some(file)
}

/// Machine-applicable suggestion spans of `diag` and all its children.
fn collect_suggestions<'d>(diag: &'d CargoDiagnostic, out: &mut Vec<(&'d DiagnosticSpan, String)>) {
    for span in &diag.spans {
        if let Some(replacement) = &span.suggested_replacement {
            if span.suggestion_applicability == Some(Applicability::MachineApplicable) {
                out.push((span, replacement.clone()));
            }
        }
    }

    for child in &diag.children {
        collect_suggestions(child, out);
    }
}
