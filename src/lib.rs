//! Cleanup Patcher: comment-preserving source cleanups for Rust
//!
//! Detectors recognize patterns in a parsed compilation unit and record
//! rewrite operations. Operations describe their edits against stable
//! [`tree::NodeRef`]s; the [`rewrite::RewriteAggregator`] resolves them,
//! rejects overlapping writes and merges everything into one
//! [`rewrite::CompositePatch`], which the [`rewrite::PatchApplier`] splices
//! into the original text in a single pass.
//!
//! # Architecture
//!
//! Every edit compiles down to a verified byte-span replacement
//! ([`edit::TextEdit`]). Intelligence lives in span acquisition (tree
//! structure, trivia attachment, compiler diagnostics), not in the
//! application logic.
//!
//! # Guarantees
//!
//! - Edits verify their expected before-text before applying
//! - A unit's patch applies completely or not at all
//! - Comments attached to a rewritten statement survive
//! - Detector registration order never changes the resulting patch
//! - Output with new syntax errors is rejected (configurable)
//!
//! # Example
//!
//! ```no_run
//! use cleanup_patcher::config::CleanupConfig;
//! use cleanup_patcher::driver::{CleanupDriver, CompilationUnit};
//!
//! let driver = CleanupDriver::new(CleanupConfig::default());
//! let unit = CompilationUnit::new("lib.rs", "fn f(x: bool) -> bool { !!x }");
//!
//! let outcome = driver.run(&unit);
//! println!("{outcome}");
//! assert_eq!(outcome.text(), Some("fn f(x: bool) -> bool { x }"));
//! ```

pub mod config;
pub mod detectors;
pub mod diagnostics;
pub mod driver;
pub mod edit;
pub mod pool;
pub mod rewrite;
pub mod tree;
pub mod trivia;
pub mod ts;
pub mod validate;
pub mod workspace;

// Re-exports
pub use config::{load_from_path, load_from_str, CleanupConfig, ConfigError, MessageTable};
pub use detectors::{Detector, DetectorKind, TreeRequirement};
pub use driver::{CleanupDriver, CompilationUnit, UnitOutcome, UnitState};
pub use edit::{EditPrimitive, EditVerification, TextEdit};
pub use rewrite::{
    CompositePatch, EditGroup, PatchApplier, RewriteAggregator, RewriteContext, RewriteError,
    RewriteOperation,
};
pub use tree::{NodeRef, ParseTree};
pub use ts::{CompilerOptions, ParseError, RustParser, RustSourceParser, SourceParser};
pub use validate::{ErrorLocation, ValidationError};
