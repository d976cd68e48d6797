use crate::detectors::{Operations, ScanInput};
use crate::rewrite::{RewriteContext, RewriteError, RewriteOperation};
use crate::tree::{Node, NodeRef, WalkControl};
use crate::trivia::CommentSide;

/// A run of `;` statements separated only by whitespace.
struct RemoveEmptyStatements {
    label: String,
    first: NodeRef,
    last: NodeRef,
}

impl RewriteOperation for RemoveEmptyStatements {
    fn label(&self) -> &str {
        &self.label
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let group = cx.default_group();
        cx.remove_statements(self.first, self.last, &group)
    }
}

/// `if !c { A } else { B }` to `if c { B } else { A }`.
struct InvertIfElse {
    label: String,
    condition: NodeRef,
    /// What remains of the condition without the `!`
    kept: NodeRef,
    consequence: NodeRef,
    alternative: NodeRef,
}

impl RewriteOperation for InvertIfElse {
    fn label(&self) -> &str {
        &self.label
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let condition = cx.node(self.condition)?;
        let kept = cx.node(self.kept)?;
        let group = cx.default_group();

        cx.replace_range_keeping_comments(
            condition.start_byte()..kept.start_byte(),
            "",
            CommentSide::Leading,
            &group,
        )?;
        if kept.end_byte() < condition.end_byte() {
            cx.replace_range_keeping_comments(
                kept.end_byte()..condition.end_byte(),
                "",
                CommentSide::Trailing,
                &group,
            )?;
        }

        cx.move_before(self.alternative, self.consequence, &group)?;
        cx.move_after(self.consequence, self.alternative, &group)
    }
}

pub(super) fn scan_empty_statements(
    input: &ScanInput<'_>,
    out: &mut Operations,
) -> Result<(), RewriteError> {
    let tree = input.tree()?;
    let source = tree.source();

    tree.walk(|node| {
        if node.kind() != "block" {
            return WalkControl::Continue;
        }

        let mut run: Option<(Node<'_>, Node<'_>)> = None;
        for child in node.children() {
            if child.kind() != "empty_statement" {
                if let Some((first, last)) = run.take() {
                    out.push(empty_run(input, first, last));
                }
                continue;
            }
            run = match run {
                Some((first, last))
                    if source[last.end_byte()..child.start_byte()]
                        .chars()
                        .all(char::is_whitespace) =>
                {
                    Some((first, child))
                }
                Some((first, last)) => {
                    out.push(empty_run(input, first, last));
                    Some((child, child))
                }
                None => Some((child, child)),
            };
        }
        if let Some((first, last)) = run {
            out.push(empty_run(input, first, last));
        }
        WalkControl::Continue
    });

    Ok(())
}

fn empty_run(
    input: &ScanInput<'_>,
    first: Node<'_>,
    last: Node<'_>,
) -> Box<dyn RewriteOperation> {
    Box::new(RemoveEmptyStatements {
        label: input.label.to_string(),
        first: first.node_ref(),
        last: last.node_ref(),
    })
}

/// The expression left after dropping a leading `!` (and the parentheses
/// it may have required).
fn without_negation(condition: Node<'_>) -> Option<Node<'_>> {
    if condition.kind() != "unary_expression" || condition.child(0)?.text() != "!" {
        return None;
    }
    let operand = condition.named_children().next()?;
    if operand.kind() == "parenthesized_expression" {
        // Braces would turn a bare struct literal into the `if` body
        let inner = operand.named_children().next()?;
        if !inner.text().contains('{') {
            return Some(inner);
        }
    }
    Some(operand)
}

pub(super) fn scan_negated_if_else(
    input: &ScanInput<'_>,
    out: &mut Operations,
) -> Result<(), RewriteError> {
    let tree = input.tree()?;

    tree.walk(|node| {
        if node.kind() != "if_expression" {
            return WalkControl::Continue;
        }
        let (Some(condition), Some(consequence), Some(else_clause)) = (
            node.child_by_field("condition"),
            node.child_by_field("consequence"),
            node.child_by_field("alternative"),
        ) else {
            return WalkControl::Continue;
        };
        // `else if` chains are left alone
        let Some(alternative) = else_clause.named_children().find(|c| c.kind() == "block") else {
            return WalkControl::Continue;
        };
        let Some(kept) = without_negation(condition) else {
            return WalkControl::Continue;
        };

        out.push(Box::new(InvertIfElse {
            label: input.label.to_string(),
            condition: condition.node_ref(),
            kept: kept.node_ref(),
            consequence: consequence.node_ref(),
            alternative: alternative.node_ref(),
        }));
        // Nested ifs move along with their block; they are handled on
        // the next run.
        WalkControl::SkipChildren
    });

    Ok(())
}
