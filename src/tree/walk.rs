//! Depth-first traversal with structured early exit.

use crate::tree::node::{Node, ParseTree};

/// What a visitor wants the traversal to do after seeing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    /// Do not descend into this node's children
    SkipChildren,
    /// End the traversal immediately
    Stop,
}

/// Preorder walk of `root`'s subtree (including `root`).
///
/// Returns `true` if the visitor stopped the walk early.
pub fn walk<'t, F>(root: Node<'t>, mut visit: F) -> bool
where
    F: FnMut(Node<'t>) -> WalkControl,
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match visit(node) {
            WalkControl::Continue => {
                let mark = stack.len();
                stack.extend(node.children());
                stack[mark..].reverse();
            }
            WalkControl::SkipChildren => {}
            WalkControl::Stop => return true,
        }
    }
    false
}

/// First node in preorder below (and including) `root` matching `predicate`.
pub fn find<'t, P>(root: Node<'t>, mut predicate: P) -> Option<Node<'t>>
where
    P: FnMut(Node<'t>) -> bool,
{
    let mut found = None;
    walk(root, |node| {
        if predicate(node) {
            found = Some(node);
            WalkControl::Stop
        } else {
            WalkControl::Continue
        }
    });
    found
}

impl ParseTree {
    /// Preorder walk of the whole tree.
    pub fn walk<'t, F>(&'t self, visit: F) -> bool
    where
        F: FnMut(Node<'t>) -> WalkControl,
    {
        walk(self.root(), visit)
    }
}
