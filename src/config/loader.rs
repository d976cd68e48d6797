use crate::config::schema::{CleanupConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read cleanup config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse cleanup config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse cleanup config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid cleanup config ({}): {}", path.display(), source),
                None => write!(f, "invalid cleanup config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse and validate against the ids in `known`.
pub fn load_from_str(input: &str, known: &[&str]) -> Result<CleanupConfig, ConfigError> {
    let config: CleanupConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate(known)
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>, known: &[&str]) -> Result<CleanupConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents, known).map_err(|error| error.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["double_negation", "unused_import"];

    #[test]
    fn full_config_round_trip() {
        let input = r#"
[cleanups]
double_negation = "true"
unused_import = "false"

[params.unused_import]
remove_whole_line = "false"

[comments]
same_line = false

[driver]
validate_syntax = false

[messages]
double_negation = "Simplify !!x"
"#;
        let config = load_from_str(input, KNOWN).unwrap();
        assert!(config.is_enabled("double_negation"));
        assert!(!config.is_enabled("unused_import"));
        assert!(!config.options("unused_import").flag("remove_whole_line", true));
        assert!(!config.comments.same_line);
        assert!(config.comments.preceding_line);
        assert!(!config.driver.validate_syntax);
        assert_eq!(config.messages["double_negation"], "Simplify !!x");
    }

    #[test]
    fn empty_input_gives_defaults() {
        let config = load_from_str("", KNOWN).unwrap();
        assert_eq!(config, CleanupConfig::default());
        assert!(config.driver.validate_syntax);
    }

    #[test]
    fn bad_toml_is_reported() {
        let err = load_from_str("[cleanups\n", KNOWN).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn path_is_attached_to_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleanups.toml");
        fs::write(&path, "[cleanups]\ndouble_negaton = \"true\"\n").unwrap();

        let err = load_from_path(&path, KNOWN).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cleanups.toml"));
        assert!(message.contains("did you mean 'double_negation'"));

        let missing = load_from_path(dir.path().join("missing.toml"), KNOWN).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
