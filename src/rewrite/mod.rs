//! The rewrite-operation model.
//!
//! Detectors walk an immutable [`ParseTree`](crate::tree::ParseTree) and
//! record [`RewriteOperation`]s. The [`RewriteAggregator`] invokes every
//! operation once, rejects overlapping edits and produces a
//! [`CompositePatch`], which the [`PatchApplier`] splices onto the original
//! text in a single pass.

pub mod aggregator;
pub mod applier;
pub mod errors;
pub mod operation;
pub mod rebase;

pub use aggregator::{CompositePatch, EditGroup, PatchEntry, RewriteAggregator};
pub use applier::{AppliedPatch, PatchApplier};
pub use errors::RewriteError;
pub use operation::{GroupHandle, RewriteContext, RewriteOperation, Snippet};
pub use rebase::OffsetMap;
