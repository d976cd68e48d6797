use crate::detectors::{Operations, ScanInput};
use crate::rewrite::{RewriteContext, RewriteError, RewriteOperation};
use crate::tree::{Node, NodeRef, WalkControl};
use crate::trivia::CommentSide;
use std::ops::Range;

/// Operands that `!` can prefix without parentheses.
const PREFIX_SAFE: &[&str] = &[
    "identifier",
    "self",
    "scoped_identifier",
    "field_expression",
    "call_expression",
    "index_expression",
    "macro_invocation",
    "parenthesized_expression",
    "unary_expression",
    "try_expression",
    "boolean_literal",
];

/// `x == true` and friends.
struct SimplifyComparison {
    label: String,
    comparison: NodeRef,
    operand: NodeRef,
    negate: bool,
}

impl RewriteOperation for SimplifyComparison {
    fn label(&self) -> &str {
        &self.label
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let comparison = cx.node(self.comparison)?;
        let operand = cx.node(self.operand)?;
        let group = cx.default_group();

        let (prefix, suffix) = match (self.negate, PREFIX_SAFE.contains(&operand.kind())) {
            (false, _) => ("", ""),
            (true, true) => ("!", ""),
            (true, false) => ("!(", ")"),
        };

        // Keep the operand's own text untouched and rewrite around it.
        write_unless_noop(
            cx,
            comparison.start_byte()..operand.start_byte(),
            prefix,
            CommentSide::Leading,
            &group,
        )?;
        write_unless_noop(
            cx,
            operand.end_byte()..comparison.end_byte(),
            suffix,
            CommentSide::Trailing,
            &group,
        )
    }
}

/// `!!x` to `x`.
struct RemoveDoubleNegation {
    label: String,
    outer: NodeRef,
    operand: NodeRef,
}

impl RewriteOperation for RemoveDoubleNegation {
    fn label(&self) -> &str {
        &self.label
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let start = cx.node(self.outer)?.start_byte();
        let end = cx.node(self.operand)?.start_byte();
        let group = cx.default_group();
        cx.replace_range_keeping_comments(start..end, "", CommentSide::Leading, &group)
    }
}

fn write_unless_noop(
    cx: &mut RewriteContext<'_>,
    range: Range<usize>,
    content: &str,
    side: CommentSide,
    group: &crate::rewrite::GroupHandle,
) -> Result<(), RewriteError> {
    if range.is_empty() && content.is_empty() {
        return Ok(());
    }
    cx.replace_range_keeping_comments(range, content, side, group)
}

fn boolean_value(node: Node<'_>) -> Option<bool> {
    if node.kind() != "boolean_literal" {
        return None;
    }
    match node.text() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// The single operand of a `!` unary expression.
fn negated_operand(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() != "unary_expression" || node.child(0)?.text() != "!" {
        return None;
    }
    node.named_children().next()
}

pub(super) fn scan_comparisons(
    input: &ScanInput<'_>,
    out: &mut Operations,
) -> Result<(), RewriteError> {
    let tree = input.tree()?;

    tree.walk(|node| {
        if node.kind() != "binary_expression" {
            return WalkControl::Continue;
        }
        let (Some(left), Some(op), Some(right)) = (
            node.child_by_field("left"),
            node.child_by_field("operator"),
            node.child_by_field("right"),
        ) else {
            return WalkControl::Continue;
        };
        let equal = match op.text() {
            "==" => true,
            "!=" => false,
            _ => return WalkControl::Continue,
        };

        let (operand, literal) = match (boolean_value(left), boolean_value(right)) {
            (None, Some(literal)) => (left, literal),
            (Some(literal), None) => (right, literal),
            _ => return WalkControl::Continue,
        };

        out.push(Box::new(SimplifyComparison {
            label: input.label.to_string(),
            comparison: node.node_ref(),
            operand: operand.node_ref(),
            negate: equal != literal,
        }));
        WalkControl::Continue
    });

    Ok(())
}

pub(super) fn scan_double_negations(
    input: &ScanInput<'_>,
    out: &mut Operations,
) -> Result<(), RewriteError> {
    let tree = input.tree()?;
    // End of the last `!!` claimed; a `!` inside it belongs to that pair.
    let mut claimed_until = 0;

    tree.walk(|node| {
        if node.start_byte() < claimed_until {
            return WalkControl::Continue;
        }
        let Some(inner) = negated_operand(node) else {
            return WalkControl::Continue;
        };
        let Some(operand) = negated_operand(inner) else {
            return WalkControl::Continue;
        };

        claimed_until = operand.start_byte();
        out.push(Box::new(RemoveDoubleNegation {
            label: input.label.to_string(),
            outer: node.node_ref(),
            operand: operand.node_ref(),
        }));
        WalkControl::Continue
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::detectors::testing::run;
    use crate::detectors::DetectorKind::{BooleanComparison, DoubleNegation};

    #[test]
    fn comparisons_with_literals() {
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { x == true }"),
            "fn f(x: bool) -> bool { x }"
        );
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { x == false }"),
            "fn f(x: bool) -> bool { !x }"
        );
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { x != true }"),
            "fn f(x: bool) -> bool { !x }"
        );
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { x != false }"),
            "fn f(x: bool) -> bool { x }"
        );
    }

    #[test]
    fn literal_on_the_left() {
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { false == x.ok }"),
            "fn f(x: bool) -> bool { !x.ok }"
        );
    }

    #[test]
    fn complex_operand_is_parenthesized() {
        assert_eq!(
            run(BooleanComparison, "fn f(a: u8) -> bool { a as u8 as bool == false }"),
            "fn f(a: u8) -> bool { !(a as u8 as bool) }"
        );
    }

    #[test]
    fn nested_comparisons_compose() {
        assert_eq!(
            run(BooleanComparison, "fn f(a: bool) -> bool { (a == true) == false }"),
            "fn f(a: bool) -> bool { !(a) }"
        );
    }

    #[test]
    fn literal_against_literal_is_left_alone() {
        let source = "fn f() -> bool { true == false }";
        assert_eq!(run(BooleanComparison, source), source);
    }

    #[test]
    fn double_negation() {
        assert_eq!(
            run(DoubleNegation, "fn f(x: bool) -> bool { !!x }"),
            "fn f(x: bool) -> bool { x }"
        );
        assert_eq!(
            run(DoubleNegation, "fn f(x: bool) -> bool { !!!x }"),
            "fn f(x: bool) -> bool { !x }"
        );
        assert_eq!(
            run(DoubleNegation, "fn f(x: bool) -> bool { !!!!x }"),
            "fn f(x: bool) -> bool { x }"
        );
    }

    #[test]
    fn comments_inside_a_comparison_survive() {
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { x /* keep */ == true }"),
            "fn f(x: bool) -> bool { x /* keep */ }"
        );
        assert_eq!(
            run(BooleanComparison, "fn f(x: bool) -> bool { false /* keep */ == x }"),
            "fn f(x: bool) -> bool { /* keep */ !x }"
        );
    }

    #[test]
    fn comments_between_negations_survive() {
        assert_eq!(
            run(DoubleNegation, "fn f(x: bool) -> bool { ! /* keep */ !x }"),
            "fn f(x: bool) -> bool { /* keep */ x }"
        );
    }

    #[test]
    fn double_negation_inside_arguments() {
        assert_eq!(
            run(DoubleNegation, "fn f(x: bool) -> bool { !!g(!!x) }"),
            "fn f(x: bool) -> bool { g(x) }"
        );
    }
}
