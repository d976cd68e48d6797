//! Immutable parse trees and structural node references.
//!
//! A [`ParseTree`] is produced once per compilation unit by a parser
//! collaborator and only ever read afterwards. Detectors hold on to
//! [`NodeRef`]s, which stay meaningful only for the snapshot they came from.

pub mod errors;
pub mod node;
pub mod walk;

pub use errors::{InvalidReferenceError, TreeBuildError};
pub use node::{Node, NodeRef, NodeSpec, ParseTree, SnapshotId, TreeBuilder};
pub use walk::{find, walk, WalkControl};
