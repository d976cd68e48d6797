//! File-system side of a cleanup run: finding sources and config, turning
//! files into compilation units and writing results back.
//!
//! The rewrite core never touches the disk; everything here is used by the
//! binary and by callers that want the same behavior.

use crate::diagnostics::ProblemsByFile;
use crate::driver::CompilationUnit;
use crate::ts::CompilerOptions;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Config file looked up from the workspace root upwards.
pub const CONFIG_FILE_NAME: &str = "cleanup-patcher.toml";

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("not a Rust source file or directory: {}", .0.display())]
    NotASource(PathBuf),
}

impl WorkspaceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Nearest `cleanup-patcher.toml` in `start` or one of its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&&*name)
}

fn is_rust_source(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("rs")
}

/// Every `.rs` file under `paths`, canonicalized, sorted and deduplicated.
///
/// Hidden directories and build output are skipped. A file named
/// explicitly must itself be a `.rs` file.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut files = Vec::new();

    for path in paths {
        let canonical = path
            .canonicalize()
            .map_err(|e| WorkspaceError::io(path, e))?;

        if canonical.is_file() {
            if !is_rust_source(&canonical) {
                return Err(WorkspaceError::NotASource(path.clone()));
            }
            files.push(canonical);
            continue;
        }

        for entry in WalkDir::new(&canonical)
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry))
        {
            let entry = entry?;
            if entry.file_type().is_file() && is_rust_source(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Read one file into a unit carrying its compiler problems.
pub fn load_unit(
    file: &Path,
    problems: &ProblemsByFile,
    options: &CompilerOptions,
) -> Result<CompilationUnit, WorkspaceError> {
    let text = fs::read_to_string(file).map_err(|e| WorkspaceError::io(file, e))?;
    Ok(CompilationUnit::new(file.display().to_string(), text)
        .with_diagnostics(problems.get(file).cloned().unwrap_or_default())
        .with_options(options.clone()))
}

/// Read `files` into units, one result per file in the same order.
///
/// A file that cannot be read fails on its own; the rest still load.
pub fn load_units(
    files: &[PathBuf],
    problems: &ProblemsByFile,
    options: &CompilerOptions,
) -> Vec<Result<CompilationUnit, WorkspaceError>> {
    files
        .iter()
        .map(|file| load_unit(file, problems, options))
        .collect()
}

/// Atomic file write: tempfile + fsync + rename, then an mtime bump so
/// incremental builds notice the change.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WorkspaceError> {
    // Same directory keeps the rename on one filesystem
    let parent = path.parent().ok_or_else(|| {
        WorkspaceError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory"),
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| WorkspaceError::io(path, e))?;
    temp.write_all(content)
        .map_err(|e| WorkspaceError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| WorkspaceError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| WorkspaceError::io(path, e.error))?;

    filetime::set_file_mtime(path, filetime::FileTime::now())
        .map_err(|e| WorkspaceError::io(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ProblemRecord, Severity};

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn collects_rust_sources_and_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("src/lib.rs"), "");
        touch(&root.join("src/nested/mod.rs"), "");
        touch(&root.join("src/notes.txt"), "");
        touch(&root.join("target/debug/build.rs"), "");
        touch(&root.join(".git/hooks/x.rs"), "");

        let files = collect_sources(&[root.to_path_buf()]).unwrap();
        let root = root.canonicalize().unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            [PathBuf::from("src/lib.rs"), PathBuf::from("src/nested/mod.rs")]
        );
    }

    #[test]
    fn explicit_files_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.rs");
        touch(&file, "fn main() {}\n");

        let files = collect_sources(&[file.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn explicit_non_rust_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("README.md");
        touch(&file, "# hi\n");

        assert!(matches!(
            collect_sources(&[file]),
            Err(WorkspaceError::NotASource(_))
        ));
    }

    #[test]
    fn units_carry_their_own_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.rs");
        let b = dir.path().join("b.rs");
        touch(&a, "use std::fmt;\n");
        touch(&b, "fn b() {}\n");

        let mut problems = ProblemsByFile::new();
        problems.insert(
            a.clone(),
            vec![ProblemRecord::new("unused_imports", 0..13, Severity::Warning)],
        );

        let units: Vec<CompilationUnit> = load_units(&[a, b], &problems, &CompilerOptions::new())
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(units[0].diagnostics.len(), 1);
        assert!(units[1].diagnostics.is_empty());
        assert_eq!(units[1].text, "fn b() {}\n");
    }

    #[test]
    fn unreadable_file_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.rs");
        let good = dir.path().join("good.rs");
        fs::write(&bad, [0xFF, 0xFE, 0x00]).unwrap();
        touch(&good, "fn good() {}\n");

        let loaded = load_units(&[bad, good], &ProblemsByFile::new(), &CompilerOptions::new());
        assert_eq!(loaded.len(), 2);
        match &loaded[0] {
            Err(WorkspaceError::Io { path, .. }) => assert!(path.ends_with("bad.rs")),
            other => panic!("expected an io error, got {other:?}"),
        }
        assert_eq!(loaded[1].as_ref().unwrap().text, "fn good() {}\n");
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.rs");
        touch(&file, "old");

        atomic_write(&file, b"new").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "new");
        // No temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn config_is_found_in_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("crates/core/src");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_config(&nested), None);

        let config = dir.path().join(CONFIG_FILE_NAME);
        touch(&config, "");
        assert_eq!(find_config(&nested), Some(config));
    }
}
