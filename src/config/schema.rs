use crate::trivia::KeepCommentPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel stored for an enabled flag.
pub const TRUE: &str = "true";
/// Sentinel stored for a disabled flag.
pub const FALSE: &str = "false";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Cleanup id to `"true"` / `"false"`; unlisted cleanups are enabled
    #[serde(default)]
    pub cleanups: BTreeMap<String, String>,
    /// Per-cleanup string parameters
    #[serde(default)]
    pub params: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub comments: KeepCommentPolicy,
    #[serde(default)]
    pub driver: DriverSettings,
    /// Edit-group label overrides, by cleanup id
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DriverSettings {
    /// Reparse output and reject new syntax errors
    pub validate_syntax: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            validate_syntax: true,
        }
    }
}

impl CleanupConfig {
    /// Check every section against the ids in `known`.
    pub fn validate(&self, known: &[&str]) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let sections = [
            ("cleanups", self.cleanups.keys().collect::<Vec<_>>()),
            ("params", self.params.keys().collect()),
            ("messages", self.messages.keys().collect()),
        ];
        for (section, ids) in sections {
            for id in ids {
                if !known.contains(&id.as_str()) {
                    issues.push(ValidationIssue::UnknownCleanup {
                        section,
                        id: id.clone(),
                        suggestion: closest(id, known).map(str::to_string),
                    });
                }
            }
        }

        for (id, value) in &self.cleanups {
            if value != TRUE && value != FALSE {
                issues.push(ValidationIssue::NotASentinel {
                    id: id.clone(),
                    value: value.clone(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.cleanups.get(id).map_or(true, |value| value != FALSE)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) {
        let value = if enabled { TRUE } else { FALSE };
        self.cleanups.insert(id.to_string(), value.to_string());
    }

    pub fn options(&self, id: &str) -> DetectorOptions {
        DetectorOptions {
            values: self.params.get(id).cloned().unwrap_or_default(),
        }
    }
}

fn closest<'k>(id: &str, known: &[&'k str]) -> Option<&'k str> {
    known
        .iter()
        .map(|candidate| (strsim::levenshtein(id, candidate), *candidate))
        .filter(|(distance, _)| *distance <= 3)
        .min()
        .map(|(_, candidate)| candidate)
}

/// String parameters of one cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorOptions {
    values: BTreeMap<String, String>,
}

impl DetectorOptions {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Boolean parameter stored as a sentinel. Anything else reads as
    /// `default`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(TRUE) => true,
            Some(FALSE) => false,
            Some(other) => {
                tracing::warn!(key, value = other, "ignoring non-boolean parameter");
                default
            }
            None => default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnknownCleanup {
        section: &'static str,
        id: String,
        suggestion: Option<String>,
    },
    NotASentinel {
        id: String,
        value: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnknownCleanup {
                section,
                id,
                suggestion,
            } => match suggestion {
                Some(name) => write!(
                    f,
                    "[{section}] names unknown cleanup '{id}' (did you mean '{name}'?)"
                ),
                None => write!(f, "[{section}] names unknown cleanup '{id}'"),
            },
            ValidationIssue::NotASentinel { id, value } => write!(
                f,
                "cleanup '{id}' must be \"{TRUE}\" or \"{FALSE}\", found \"{value}\""
            ),
        }
    }
}
