use crate::tree::node::{NodeRef, SnapshotId};
use thiserror::Error;

/// A [`NodeRef`] was resolved against a tree it was not taken from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("node reference {reference} does not belong to tree snapshot {tree}")]
pub struct InvalidReferenceError {
    pub reference: NodeRef,
    pub tree: SnapshotId,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeBuildError {
    #[error("tree has no root node")]
    Empty,

    #[error("second root node '{kind}' at byte {byte_start}")]
    MultipleRoots { kind: &'static str, byte_start: usize },

    #[error("close() called with no open node")]
    UnbalancedClose,

    #[error("{count} node(s) left open")]
    Unclosed { count: usize },

    #[error("node '{kind}' has invalid range [{byte_start}, {byte_end}) for text of length {text_len}")]
    InvalidRange {
        kind: &'static str,
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },

    #[error("node '{kind}' [{byte_start}, {byte_end}) escapes its parent [{parent_start}, {parent_end})")]
    OutsideParent {
        kind: &'static str,
        byte_start: usize,
        byte_end: usize,
        parent_start: usize,
        parent_end: usize,
    },
}
