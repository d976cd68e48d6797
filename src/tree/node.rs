use crate::tree::errors::{InvalidReferenceError, TreeBuildError};
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

/// Identity of one immutable [`ParseTree`].
///
/// Every tree gets a fresh id when it is built, so references taken from a
/// reparse never resolve against the tree they were not derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(u64);

impl SnapshotId {
    fn next() -> Self {
        SnapshotId(NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural locator for a node: the snapshot it came from plus its
/// preorder position in that snapshot.
///
/// Two references are equal iff they denote the same position in the same
/// snapshot. Content is never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    snapshot: SnapshotId,
    index: usize,
}

impl NodeRef {
    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    /// Resolve against `tree`, failing if the reference belongs to another snapshot.
    pub fn resolve(self, tree: &ParseTree) -> Result<Node<'_>, InvalidReferenceError> {
        if self.snapshot != tree.snapshot || self.index >= tree.nodes.len() {
            return Err(InvalidReferenceError {
                reference: self,
                tree: tree.snapshot,
            });
        }
        Ok(Node {
            tree,
            index: self.index,
        })
    }

    /// Byte range of the referenced node in the tree's original text.
    pub fn range(self, tree: &ParseTree) -> Result<Range<usize>, InvalidReferenceError> {
        self.resolve(tree).map(|node| node.byte_range())
    }

    /// Child-slot indices leading from the root to this node.
    pub fn path(self, tree: &ParseTree) -> Result<Vec<usize>, InvalidReferenceError> {
        let mut node = self.resolve(tree)?;
        let mut path = Vec::new();
        while let Some(parent) = node.parent() {
            path.push(node.data().slot);
            node = parent;
        }
        path.reverse();
        Ok(path)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snapshot, self.index)
    }
}

/// Description of one node handed to a [`TreeBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Grammar symbol name, e.g. `binary_expression`
    pub kind: &'static str,
    pub byte_start: usize,
    pub byte_end: usize,
    /// Field this node occupies in its parent, if the grammar names it
    pub field: Option<&'static str>,
    /// Named nodes are grammar symbols; anonymous nodes are literal tokens
    pub named: bool,
    pub comment: bool,
    /// ERROR or MISSING node produced by error recovery
    pub error: bool,
}

impl NodeSpec {
    pub fn new(kind: &'static str, range: Range<usize>) -> Self {
        Self {
            kind,
            byte_start: range.start,
            byte_end: range.end,
            field: None,
            named: true,
            comment: false,
            error: false,
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.named = false;
        self
    }

    pub fn as_comment(mut self) -> Self {
        self.comment = true;
        self
    }

    pub fn as_error(mut self) -> Self {
        self.error = true;
        self
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    spec: NodeSpec,
    parent: Option<usize>,
    slot: usize,
    children: Vec<usize>,
}

/// Immutable, read-only syntax tree for one compilation unit.
///
/// Nodes live in a preorder arena. The tree owns the text it was parsed
/// from so that node text can always be rendered from the original.
#[derive(Debug)]
pub struct ParseTree {
    snapshot: SnapshotId,
    source: String,
    nodes: Vec<NodeData>,
    comments: Vec<usize>,
    error_count: usize,
}

impl ParseTree {
    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    /// The text this tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            index: 0,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        (0..self.nodes.len())
            .filter(move |&index| self.nodes[index].spec.error)
            .map(move |index| Node { tree: self, index })
    }

    /// Comment nodes in source order.
    pub fn comments(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        self.comments
            .iter()
            .map(move |&index| Node { tree: self, index })
    }

    /// Comments lying wholly inside `range`, in source order.
    pub fn comments_within(&self, range: Range<usize>) -> impl Iterator<Item = Node<'_>> + '_ {
        self.comments()
            .filter(move |comment| range.start <= comment.start_byte() && comment.end_byte() <= range.end)
    }

    /// The last comment that ends at or before `offset`.
    pub fn comment_before(&self, offset: usize) -> Option<Node<'_>> {
        let upto = self
            .comments
            .partition_point(|&index| self.nodes[index].spec.byte_start < offset);
        self.comments[..upto]
            .iter()
            .rev()
            .map(|&index| Node { tree: self, index })
            .find(|node| node.end_byte() <= offset)
    }

    /// The smallest node whose range contains `range`.
    pub fn node_covering(&self, range: Range<usize>) -> Option<Node<'_>> {
        let root = self.root();
        if root.start_byte() > range.start || root.end_byte() < range.end {
            return None;
        }

        let mut current = root;
        'descend: loop {
            for child in current.children() {
                if child.start_byte() <= range.start && range.end <= child.end_byte() {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }
}

/// Borrowed view of one node in a [`ParseTree`].
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t ParseTree,
    index: usize,
}

impl<'t> Node<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.index]
    }

    fn at(&self, index: usize) -> Node<'t> {
        Node {
            tree: self.tree,
            index,
        }
    }

    pub fn tree(&self) -> &'t ParseTree {
        self.tree
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            snapshot: self.tree.snapshot,
            index: self.index,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.data().spec.kind
    }

    pub fn start_byte(&self) -> usize {
        self.data().spec.byte_start
    }

    pub fn end_byte(&self) -> usize {
        self.data().spec.byte_end
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    /// Original source text spanned by this node.
    pub fn text(&self) -> &'t str {
        &self.tree.source[self.byte_range()]
    }

    pub fn is_named(&self) -> bool {
        self.data().spec.named
    }

    pub fn is_comment(&self) -> bool {
        self.data().spec.comment
    }

    pub fn is_error(&self) -> bool {
        self.data().spec.error
    }

    pub fn field_name(&self) -> Option<&'static str> {
        self.data().spec.field
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|index| self.at(index))
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, slot: usize) -> Option<Node<'t>> {
        self.data().children.get(slot).map(|&index| self.at(index))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&index| Node { tree, index })
    }

    /// Named, non-comment children.
    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        self.children()
            .filter(|child| child.is_named() && !child.is_comment())
    }

    pub fn child_by_field(&self, field: &str) -> Option<Node<'t>> {
        self.children()
            .find(|child| child.field_name() == Some(field))
    }

    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        parent.child(self.data().slot + 1)
    }

    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let slot = self.data().slot.checked_sub(1)?;
        parent.child(slot)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.index == other.index
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.kind(), self.start_byte(), self.end_byte())
    }
}

/// Incremental, document-order construction of a [`ParseTree`].
///
/// Parsers feed nodes in preorder: `open` a node with children, add its
/// children, then `close` it. Range problems are reported by [`build`].
///
/// [`build`]: TreeBuilder::build
pub struct TreeBuilder {
    source: String,
    nodes: Vec<NodeData>,
    open: Vec<usize>,
    error: Option<TreeBuildError>,
}

impl TreeBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
            open: Vec::new(),
            error: None,
        }
    }

    pub fn open(&mut self, kind: &'static str, range: Range<usize>) -> &mut Self {
        self.push(NodeSpec::new(kind, range), true)
    }

    pub fn open_field(
        &mut self,
        field: &'static str,
        kind: &'static str,
        range: Range<usize>,
    ) -> &mut Self {
        self.push(NodeSpec::new(kind, range).with_field(field), true)
    }

    pub fn leaf(&mut self, kind: &'static str, range: Range<usize>) -> &mut Self {
        self.push(NodeSpec::new(kind, range), false)
    }

    pub fn leaf_field(
        &mut self,
        field: &'static str,
        kind: &'static str,
        range: Range<usize>,
    ) -> &mut Self {
        self.push(NodeSpec::new(kind, range).with_field(field), false)
    }

    /// Anonymous token such as `;` or `==`.
    pub fn token(&mut self, kind: &'static str, range: Range<usize>) -> &mut Self {
        self.push(NodeSpec::new(kind, range).anonymous(), false)
    }

    pub fn comment(&mut self, kind: &'static str, range: Range<usize>) -> &mut Self {
        self.push(NodeSpec::new(kind, range).as_comment(), false)
    }

    /// Add a node; `open` nodes receive the following nodes as children
    /// until the matching [`close`](TreeBuilder::close).
    pub fn push(&mut self, spec: NodeSpec, open: bool) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        if self.open.is_empty() && !self.nodes.is_empty() {
            self.error = Some(TreeBuildError::MultipleRoots {
                kind: spec.kind,
                byte_start: spec.byte_start,
            });
            return self;
        }

        if let Err(err) = self.check_range(&spec) {
            self.error = Some(err);
            return self;
        }

        let index = self.nodes.len();
        let parent = self.open.last().copied();
        let slot = match parent {
            Some(parent) => {
                let siblings = &mut self.nodes[parent].children;
                siblings.push(index);
                siblings.len() - 1
            }
            None => 0,
        };

        self.nodes.push(NodeData {
            spec,
            parent,
            slot,
            children: Vec::new(),
        });

        if open {
            self.open.push(index);
        }
        self
    }

    pub fn close(&mut self) -> &mut Self {
        if self.error.is_none() && self.open.pop().is_none() {
            self.error = Some(TreeBuildError::UnbalancedClose);
        }
        self
    }

    fn check_range(&self, spec: &NodeSpec) -> Result<(), TreeBuildError> {
        let text_len = self.source.len();
        if spec.byte_start > spec.byte_end
            || spec.byte_end > text_len
            || !self.source.is_char_boundary(spec.byte_start)
            || !self.source.is_char_boundary(spec.byte_end)
        {
            return Err(TreeBuildError::InvalidRange {
                kind: spec.kind,
                byte_start: spec.byte_start,
                byte_end: spec.byte_end,
                text_len,
            });
        }

        if let Some(&parent) = self.open.last() {
            let parent = &self.nodes[parent].spec;
            if spec.byte_start < parent.byte_start || spec.byte_end > parent.byte_end {
                return Err(TreeBuildError::OutsideParent {
                    kind: spec.kind,
                    byte_start: spec.byte_start,
                    byte_end: spec.byte_end,
                    parent_start: parent.byte_start,
                    parent_end: parent.byte_end,
                });
            }
        }

        Ok(())
    }

    pub fn build(self) -> Result<ParseTree, TreeBuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.nodes.is_empty() {
            return Err(TreeBuildError::Empty);
        }
        if !self.open.is_empty() {
            return Err(TreeBuildError::Unclosed {
                count: self.open.len(),
            });
        }

        let comments = (0..self.nodes.len())
            .filter(|&index| self.nodes[index].spec.comment)
            .collect();
        let error_count = self.nodes.iter().filter(|node| node.spec.error).count();

        Ok(ParseTree {
            snapshot: SnapshotId::next(),
            source: self.source,
            nodes: self.nodes,
            comments,
            error_count,
        })
    }
}
