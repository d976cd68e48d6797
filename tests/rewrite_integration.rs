//! Integration tests for the rewrite pipeline
//!
//! Detectors and hand-written operations feed a RewriteAggregator; the
//! composite patch is applied with the PatchApplier.

use cleanup_patcher::config::{CleanupConfig, DetectorOptions};
use cleanup_patcher::detectors::{Detector, DetectorKind, Operations, ScanInput};
use cleanup_patcher::driver::{CleanupDriver, CompilationUnit};
use cleanup_patcher::rewrite::{
    CompositePatch, PatchApplier, RewriteAggregator, RewriteContext, RewriteError,
    RewriteOperation,
};
use cleanup_patcher::tree::{NodeRef, ParseTree, TreeBuilder, WalkControl};
use cleanup_patcher::trivia::KeepCommentPolicy;
use cleanup_patcher::ts::RustParser;

fn parse(source: &str) -> ParseTree {
    RustParser::new().unwrap().parse(source).unwrap()
}

/// Scan `source` with `kinds` in the given order and aggregate.
fn patch_for(source: &str, tree: &ParseTree, kinds: &[DetectorKind]) -> CompositePatch {
    let options = DetectorOptions::default();
    let mut operations = Operations::new();
    for kind in kinds {
        let input = ScanInput {
            text: source,
            tree: Some(tree),
            diagnostics: &[],
            options: &options,
            label: kind.default_message(),
        };
        kind.scan(&input, &mut operations).unwrap();
    }

    let mut aggregator = RewriteAggregator::new();
    aggregator.extend(operations);
    aggregator.aggregate(tree).unwrap()
}

#[test]
fn test_empty_patch_round_trip() {
    let source = "fn main() {\n    // ünïcödé stays\n    let s = \"✓\";\n}\n";
    let tree = parse(source);

    let patch = RewriteAggregator::new().aggregate(&tree).unwrap();
    assert!(patch.is_empty());

    let applied = PatchApplier::new().apply(source, &patch).unwrap();
    assert_eq!(applied.text.as_bytes(), source.as_bytes());
    assert!(!applied.changed);
    assert!(applied.groups.is_empty());
}

#[test]
fn test_second_pass_is_idempotent() {
    let driver = CleanupDriver::new(CleanupConfig::default());
    let sources = [
        "fn f(x: bool) -> bool { !!x }\n",
        "fn f(x: bool) -> bool { x == false }\n",
        "fn f() {\n    a();\n    ;\n    b();;\n}\n",
        "fn f(c: bool) { if !c { a(); } else { b(); } }\n",
        "fn f(x: bool) { if x != true { a(); } else { b(); } }\n",
    ];

    for source in sources {
        let first = driver.run(&CompilationUnit::new("first.rs", source));
        assert!(first.is_changed(), "{source}");

        let cleaned = first.text().unwrap();
        let second = driver.run(&CompilationUnit::new("second.rs", cleaned));
        assert!(!second.is_changed(), "second pass changed {cleaned:?}");
        assert_eq!(second.text(), Some(cleaned));
    }
}

#[test]
fn test_scheduling_order_does_not_change_patch() {
    let source = "fn f(x: bool, c: bool) -> bool {\n    ;\n    if !c { a(); } else { b(); }\n    !!x == true\n}\n";
    let tree = parse(source);

    let forward = DetectorKind::ALL;
    let mut reversed = DetectorKind::ALL;
    reversed.reverse();
    let rotated = [
        DetectorKind::EmptyStatement,
        DetectorKind::BooleanComparison,
        DetectorKind::UnusedImport,
        DetectorKind::NegatedIfElse,
        DetectorKind::DoubleNegation,
    ];

    let expected = patch_for(source, &tree, &forward);
    assert!(expected.len() >= 5);
    for order in [&reversed[..], &rotated[..]] {
        let patch = patch_for(source, &tree, order);
        assert_eq!(patch, expected);

        let applier = PatchApplier::new();
        assert_eq!(
            applier.apply(source, &patch).unwrap().text,
            applier.apply(source, &expected).unwrap().text
        );
    }

    let text = PatchApplier::new().apply(source, &expected).unwrap().text;
    assert_eq!(
        text,
        "fn f(x: bool, c: bool) -> bool {\n    if c { b(); } else { a(); }\n    x\n}\n"
    );
}

#[test]
fn test_two_fixes_yield_two_ascending_entries() {
    let source = "fn f(x: bool) -> bool {\n    ;\n    !!x\n}\n";
    let tree = parse(source);

    let a = patch_for(
        source,
        &tree,
        &[DetectorKind::DoubleNegation, DetectorKind::EmptyStatement],
    );
    let b = patch_for(
        source,
        &tree,
        &[DetectorKind::EmptyStatement, DetectorKind::DoubleNegation],
    );

    for patch in [&a, &b] {
        let ranges: Vec<_> = patch.entries().iter().map(|e| e.edit.range()).collect();
        // The stray `;` line, then the `!!`
        assert_eq!(ranges, [24..30, 34..36]);
    }
    assert_eq!(a, b);
    assert_eq!(
        PatchApplier::new().apply(source, &a).unwrap().text,
        "fn f(x: bool) -> bool {\n    x\n}\n"
    );
}

/// Replaces a statement, leaving its comments to the keep-comment policy.
struct ReplaceStatement {
    target: NodeRef,
    content: &'static str,
}

impl RewriteOperation for ReplaceStatement {
    fn label(&self) -> &str {
        "replace statement"
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let group = cx.default_group();
        cx.replace_statement(self.target, self.content, &group)
    }
}

fn replace_call(source: &str, policy: KeepCommentPolicy) -> String {
    let tree = parse(source);
    let start = source.find("foo();").unwrap();
    let call = tree.node_covering(start..start + 6).unwrap();
    assert_eq!(call.kind(), "expression_statement");

    let mut aggregator = RewriteAggregator::with_policy(policy);
    aggregator.push(ReplaceStatement {
        target: call.node_ref(),
        content: "bar();",
    });
    let patch = aggregator.aggregate(&tree).unwrap();
    PatchApplier::new().apply(source, &patch).unwrap().text
}

#[test]
fn test_statement_replace_keeps_comment_adjacent() {
    let source = "fn f(x: bool) { if x { /* keep */ foo(); } }";
    assert_eq!(
        replace_call(source, KeepCommentPolicy::default()),
        "fn f(x: bool) { if x { /* keep */ bar(); } }"
    );

    let detached = KeepCommentPolicy {
        same_line: false,
        preceding_line: false,
    };
    assert_eq!(
        replace_call(source, detached),
        "fn f(x: bool) { if x { /* keep */ bar(); } }"
    );
}

#[test]
fn test_statement_replace_keeps_preceding_line_comment() {
    let source = "fn f() {\n    // keep\n    foo();\n}\n";
    assert_eq!(
        replace_call(source, KeepCommentPolicy::default()),
        "fn f() {\n    // keep\n    bar();\n}\n"
    );
}

/// `Boolean.TRUE` / `Boolean.FALSE` to the primitive literal.
struct InlineBooleanConstant {
    target: NodeRef,
    literal: &'static str,
}

impl RewriteOperation for InlineBooleanConstant {
    fn label(&self) -> &str {
        "Use primitive boolean literal"
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let group = cx.default_group();
        cx.replace(self.target, self.literal, &group)
    }
}

#[test]
fn test_boxed_boolean_constant_on_hand_built_tree() {
    let source = "boolean b = Boolean.TRUE;";
    let mut builder = TreeBuilder::new(source);
    builder
        .open("local_variable_declaration", 0..25)
        .leaf_field("type", "boolean_type", 0..7)
        .open_field("declarator", "variable_declarator", 8..24)
        .leaf_field("name", "identifier", 8..9)
        .token("=", 10..11)
        .open_field("value", "field_access", 12..24)
        .leaf_field("object", "identifier", 12..19)
        .token(".", 19..20)
        .leaf_field("field", "identifier", 20..24)
        .close()
        .close()
        .token(";", 24..25)
        .close();
    let tree = builder.build().unwrap();

    let mut aggregator = RewriteAggregator::new();
    let mut found = Vec::new();
    tree.walk(|node| {
        if node.kind() == "field_access" {
            let literal = match node.text() {
                "Boolean.TRUE" => Some("true"),
                "Boolean.FALSE" => Some("false"),
                _ => None,
            };
            if let Some(literal) = literal {
                found.push(InlineBooleanConstant {
                    target: node.node_ref(),
                    literal,
                });
            }
        }
        WalkControl::Continue
    });
    assert_eq!(found.len(), 1);
    for operation in found {
        aggregator.push(operation);
    }

    let patch = aggregator.aggregate(&tree).unwrap();
    assert_eq!(patch.len(), 1);
    assert_eq!(patch.groups()[0].label, "Use primitive boolean literal");

    let applied = PatchApplier::new().apply(source, &patch).unwrap();
    assert_eq!(applied.text, "boolean b = true;");
    assert!(applied.changed);
}

#[test]
fn test_patch_against_edited_text_is_stale() {
    let source = "fn f(x: bool) -> bool { !!x }";
    let tree = parse(source);
    let patch = patch_for(source, &tree, &[DetectorKind::DoubleNegation]);

    let edited = "fn f(x: bool) -> bool { x }";
    assert!(matches!(
        PatchApplier::new().apply(edited, &patch),
        Err(RewriteError::StaleTree { .. })
    ));
}
