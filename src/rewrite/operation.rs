//! Rewrite operations and the context they contribute edits through.

use crate::edit::{EditPrimitive, SpliceError, TextEdit};
use crate::rewrite::errors::RewriteError;
use crate::tree::{Node, NodeRef, ParseTree};
use crate::trivia::{keep_inner_comments, whole_line, CommentSide, EditScope, KeepCommentPolicy};
use std::ops::Range;

/// A named unit of work discovered during traversal.
///
/// Operations capture [`NodeRef`]s and plain values while a detector walks
/// the tree; all text offsets are resolved later, inside [`contribute`],
/// which the aggregator calls exactly once.
///
/// [`contribute`]: RewriteOperation::contribute
pub trait RewriteOperation: Send {
    /// Human-readable label, used as the default edit-group name.
    fn label(&self) -> &str;

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError>;
}

/// Handle to a named edit group; every primitive is tagged with one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupHandle {
    label: String,
}

impl GroupHandle {
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Node(NodeRef),
}

/// New code fabricated from literal text and copies of original nodes.
///
/// ```
/// # use cleanup_patcher::rewrite::Snippet;
/// # fn build(operand: cleanup_patcher::tree::NodeRef) -> Snippet {
/// Snippet::new().text("!(").node(operand).text(")")
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    pieces: Vec<Piece>,
}

impl Snippet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.pieces.push(Piece::Text(text.into()));
        self
    }

    /// Placeholder rendered as the node's original source text.
    pub fn node(mut self, node: NodeRef) -> Self {
        self.pieces.push(Piece::Node(node));
        self
    }
}

/// Edit collector handed to one operation's `contribute`.
///
/// Checks each new primitive against the ones this operation already
/// contributed; overlaps across operations are the aggregator's job.
pub struct RewriteContext<'a> {
    text: &'a str,
    tree: Option<&'a ParseTree>,
    policy: KeepCommentPolicy,
    operation: &'a str,
    accepted: Vec<(EditPrimitive, Vec<TextEdit>)>,
}

impl<'a> RewriteContext<'a> {
    pub(crate) fn new(
        text: &'a str,
        tree: Option<&'a ParseTree>,
        policy: KeepCommentPolicy,
        operation: &'a str,
    ) -> Self {
        Self {
            text,
            tree,
            policy,
            operation,
            accepted: Vec::new(),
        }
    }

    pub(crate) fn into_primitives(self) -> Vec<EditPrimitive> {
        self.accepted.into_iter().map(|(primitive, _)| primitive).collect()
    }

    /// The original text of the unit being rewritten.
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn tree(&self) -> Result<&'a ParseTree, RewriteError> {
        self.tree.ok_or_else(|| RewriteError::MissingTree {
            label: self.operation.to_string(),
        })
    }

    pub fn node(&self, reference: NodeRef) -> Result<Node<'a>, RewriteError> {
        Ok(reference.resolve(self.tree()?)?)
    }

    pub fn policy(&self) -> KeepCommentPolicy {
        self.policy
    }

    pub fn create_group(&self, label: impl Into<String>) -> GroupHandle {
        GroupHandle {
            label: label.into(),
        }
    }

    /// The group named after the running operation.
    pub fn default_group(&self) -> GroupHandle {
        self.create_group(self.operation)
    }

    pub fn render(&self, snippet: &Snippet) -> Result<String, RewriteError> {
        let mut out = String::new();
        for piece in &snippet.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Node(reference) => out.push_str(self.node(*reference)?.text()),
            }
        }
        Ok(out)
    }

    /// Replace an expression-level node; adjacent comments are untouched.
    pub fn replace(
        &mut self,
        target: NodeRef,
        content: impl Into<String>,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let range = self.node(target)?.byte_range();
        let primitive =
            EditPrimitive::replace(range.clone(), &self.text[range], content, group.label());
        self.accept(primitive)
    }

    /// Replace a statement, re-emitting its attached leading comments in
    /// front of `content`.
    pub fn replace_statement(
        &mut self,
        target: NodeRef,
        content: impl Into<String>,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let node = self.node(target)?;
        let claimed = self
            .policy
            .claim(node.tree(), node.byte_range(), EditScope::Statement);

        let text = self.text;
        let content = format!("{}{}", claimed.kept(text), content.into());
        let original = &text[claimed.range.clone()];
        self.accept(EditPrimitive::replace(
            claimed.range,
            original,
            content,
            group.label(),
        ))
    }

    pub fn remove(&mut self, target: NodeRef, group: &GroupHandle) -> Result<(), RewriteError> {
        let range = self.node(target)?.byte_range();
        let primitive = EditPrimitive::delete(range.clone(), &self.text[range], group.label());
        self.accept(primitive)
    }

    /// Remove a statement.
    ///
    /// Attached leading comments survive in place of the statement. Without
    /// one, the whole line goes if the statement is alone on it.
    pub fn remove_statement(
        &mut self,
        target: NodeRef,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        self.remove_statements(target, target, group)
    }

    /// Remove the sibling statements from `first` through `last` as one
    /// write, with the same comment and line handling as
    /// [`remove_statement`](Self::remove_statement).
    ///
    /// When the run shares its line with other code, the blank that would
    /// be left between its neighbours is removed as well.
    pub fn remove_statements(
        &mut self,
        first: NodeRef,
        last: NodeRef,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let start = self.node(first)?;
        let end = self.node(last)?.end_byte();
        let claimed = self
            .policy
            .claim(start.tree(), start.start_byte()..end, EditScope::Statement);

        let text = self.text;
        if claimed.has_attached_comment() {
            let kept = claimed.kept(text).trim_end().to_string();
            let original = &text[claimed.range.clone()];
            return self.accept(EditPrimitive::replace(
                claimed.range,
                original,
                kept,
                group.label(),
            ));
        }

        let range = whole_line(text, claimed.range.clone())
            .unwrap_or_else(|| between_blanks(text, claimed.range));
        let primitive = EditPrimitive::delete(range.clone(), &text[range], group.label());
        self.accept(primitive)
    }

    pub fn insert_before(
        &mut self,
        anchor: NodeRef,
        content: impl Into<String>,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let at = self.node(anchor)?.start_byte();
        self.accept(EditPrimitive::insert(at, content, group.label()))
    }

    pub fn insert_after(
        &mut self,
        anchor: NodeRef,
        content: impl Into<String>,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let at = self.node(anchor)?.end_byte();
        self.accept(EditPrimitive::insert(at, content, group.label()))
    }

    pub fn move_before(
        &mut self,
        source: NodeRef,
        anchor: NodeRef,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let dest = self.node(anchor)?.start_byte();
        self.relocate(source, dest, false, group)
    }

    pub fn move_after(
        &mut self,
        source: NodeRef,
        anchor: NodeRef,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let dest = self.node(anchor)?.end_byte();
        self.relocate(source, dest, false, group)
    }

    pub fn copy_before(
        &mut self,
        source: NodeRef,
        anchor: NodeRef,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let dest = self.node(anchor)?.start_byte();
        self.relocate(source, dest, true, group)
    }

    pub fn copy_after(
        &mut self,
        source: NodeRef,
        anchor: NodeRef,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let dest = self.node(anchor)?.end_byte();
        self.relocate(source, dest, true, group)
    }

    /// Replace a raw byte range; for operations built from diagnostics
    /// rather than tree nodes.
    pub fn replace_range(
        &mut self,
        range: Range<usize>,
        content: impl Into<String>,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let original = self.slice(range.clone())?;
        self.accept(EditPrimitive::replace(range, original, content, group.label()))
    }

    /// Replace part of an expression. Comments inside `range` are put back
    /// on `side` of `content` instead of being dropped with it.
    pub fn replace_range_keeping_comments(
        &mut self,
        range: Range<usize>,
        content: &str,
        side: CommentSide,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let content = match self.tree {
            Some(tree) => keep_inner_comments(tree, range.clone(), content, side),
            None => content.to_string(),
        };
        self.replace_range(range, content, group)
    }

    pub fn delete_range(
        &mut self,
        range: Range<usize>,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let original = self.slice(range.clone())?;
        self.accept(EditPrimitive::delete(range, original, group.label()))
    }

    fn relocate(
        &mut self,
        source: NodeRef,
        dest: usize,
        is_copy: bool,
        group: &GroupHandle,
    ) -> Result<(), RewriteError> {
        let node = self.node(source)?;
        self.accept(EditPrimitive::move_or_copy(
            node.byte_range(),
            node.text(),
            dest,
            is_copy,
            group.label(),
        ))
    }

    fn slice(&self, range: Range<usize>) -> Result<&'a str, RewriteError> {
        if range.start > range.end || range.end > self.text.len() {
            return Err(SpliceError::InvalidByteRange {
                byte_start: range.start,
                byte_end: range.end,
                text_len: self.text.len(),
            }
            .into());
        }
        self.text.get(range.clone()).ok_or_else(|| {
            SpliceError::NotCharBoundary {
                byte_start: range.start,
                byte_end: range.end,
            }
            .into()
        })
    }

    fn accept(&mut self, primitive: EditPrimitive) -> Result<(), RewriteError> {
        let footprints = primitive.footprints();

        for (earlier, earlier_footprints) in &self.accepted {
            for new in &footprints {
                if let Some(old) = earlier_footprints.iter().find(|old| old.overlaps(new)) {
                    return Err(RewriteError::OperationConflict {
                        first_label: earlier.label().to_string(),
                        first_range: old.range(),
                        second_label: primitive.label().to_string(),
                        second_range: new.range(),
                    });
                }
            }
        }

        tracing::trace!(
            operation = self.operation,
            range = ?primitive.range(),
            "accepted edit"
        );
        self.accepted.push((primitive, footprints));
        Ok(())
    }
}

/// Widen `range` over the spaces after it when spaces also precede it, so
/// `{ ; x` becomes `{ x` rather than `{  x`.
fn between_blanks(text: &str, range: Range<usize>) -> Range<usize> {
    let blank = |c: char| c == ' ' || c == '\t';
    if !text[..range.start].ends_with(blank) {
        return range;
    }
    let trailing = text[range.end..].len() - text[range.end..].trim_start_matches(blank).len();
    let end = range.end + trailing;
    // A line end after the blanks keeps the range as it was
    if end == text.len() || text[end..].starts_with(['\n', '\r']) {
        return range;
    }
    range.start..end
}
