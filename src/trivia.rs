//! Comment attachment ("keep comment") policy.
//!
//! Statement-level rewrites claim the comments attached in front of the
//! statement so that no other edit can touch them, and re-emit them in front
//! of the replacement. Expression-level rewrites never claim comments, but
//! comments sitting inside the text they remove are carried over.

use crate::tree::ParseTree;
use serde::Deserialize;
use std::ops::Range;

/// Granularity of a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    /// Part of an expression; adjacent comments are left alone
    Expression,
    /// A whole statement; attached leading comments travel with it
    Statement,
}

/// Which leading comments count as attached to the node that follows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeepCommentPolicy {
    /// `/* c */ stmt;` (only spaces between comment and node)
    pub same_line: bool,
    /// Comment on its own line directly above the node, no blank line between
    pub preceding_line: bool,
}

impl Default for KeepCommentPolicy {
    fn default() -> Self {
        Self {
            same_line: true,
            preceding_line: true,
        }
    }
}

/// Range a statement-level rewrite writes, widened over attached comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedRange {
    /// Full write range, starting at the first attached comment
    pub range: Range<usize>,
    /// Start of the node itself; `range.start..node_start` is kept trivia
    pub node_start: usize,
}

impl ClaimedRange {
    pub fn has_attached_comment(&self) -> bool {
        self.range.start < self.node_start
    }

    /// The attached comments and the whitespace between them and the node.
    pub fn kept<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.start..self.node_start]
    }
}

impl KeepCommentPolicy {
    /// Widen `node` for a rewrite of the given scope.
    pub fn claim(&self, tree: &ParseTree, node: Range<usize>, scope: EditScope) -> ClaimedRange {
        let start = match scope {
            EditScope::Expression => node.start,
            EditScope::Statement => self.attached_start(tree, node.start),
        };
        ClaimedRange {
            range: start..node.end,
            node_start: node.start,
        }
    }

    /// Start of the chain of comments attached in front of `offset`, or
    /// `offset` itself if none is attached.
    pub fn attached_start(&self, tree: &ParseTree, offset: usize) -> usize {
        let source = tree.source();
        let mut start = offset;

        while let Some(comment) = tree.comment_before(start) {
            let gap = &source[comment.end_byte()..start];
            if !gap.chars().all(char::is_whitespace) {
                break;
            }

            // Line comments may carry their terminating newline.
            let breaks = gap.matches('\n').count() + usize::from(comment.text().ends_with('\n'));
            let attached = match breaks {
                0 => self.same_line,
                1 => self.preceding_line && starts_line(source, comment.start_byte()),
                _ => false,
            };
            if !attached {
                break;
            }
            start = comment.start_byte();
        }

        start
    }
}

/// Where comments rescued from removed text are put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSide {
    /// In front of the replacement, e.g. `/* c */ x`
    Leading,
    /// After the replacement, e.g. `x /* c */`
    Trailing,
}

/// `content` plus every comment lying inside `range`, placed on `side`.
///
/// Line comments are always followed by a line break so that nothing after
/// them is swallowed.
pub fn keep_inner_comments(
    tree: &ParseTree,
    range: Range<usize>,
    content: &str,
    side: CommentSide,
) -> String {
    let comments: Vec<&str> = tree
        .comments_within(range)
        .map(|comment| comment.text().trim_end())
        .collect();
    if comments.is_empty() {
        return content.to_string();
    }

    let mut out = String::new();
    match side {
        CommentSide::Leading => {
            for comment in comments {
                out.push_str(comment);
                out.push(if is_line_comment(comment) { '\n' } else { ' ' });
            }
            out.push_str(content);
        }
        CommentSide::Trailing => {
            out.push_str(content);
            for comment in &comments {
                out.push(' ');
                out.push_str(comment);
            }
            if comments.last().is_some_and(|comment| is_line_comment(comment)) {
                out.push('\n');
            }
        }
    }
    out
}

fn is_line_comment(text: &str) -> bool {
    text.starts_with("//")
}

/// Whether only horizontal whitespace precedes `offset` on its line.
pub fn starts_line(source: &str, offset: usize) -> bool {
    source[..offset]
        .chars()
        .rev()
        .take_while(|&c| c != '\n')
        .all(|c| c == ' ' || c == '\t')
}

/// Extend `range` to the whole line(s) it sits on when nothing but
/// whitespace shares those lines, including the trailing newline.
///
/// Returns `None` when other code shares the line.
pub fn whole_line(source: &str, range: Range<usize>) -> Option<Range<usize>> {
    if !starts_line(source, range.start) {
        return None;
    }

    let rest = &source[range.end..];
    let line_tail = rest.find('\n').map_or(rest.len(), |i| i + 1);
    if !rest[..line_tail].trim().is_empty() {
        return None;
    }

    let line_start = source[..range.start].rfind('\n').map_or(0, |i| i + 1);
    Some(line_start..range.end + line_tail)
}
