//! Collects rewrite operations for one compilation unit and merges their
//! edits into a single conflict-free patch.

use crate::edit::{EditPrimitive, TextEdit};
use crate::rewrite::errors::RewriteError;
use crate::rewrite::operation::{RewriteContext, RewriteOperation};
use crate::tree::ParseTree;
use crate::trivia::KeepCommentPolicy;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

/// Named bundle of text edits, for presentation and undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditGroup {
    pub label: String,
    pub edits: Vec<TextEdit>,
}

/// One text-level write in a [`CompositePatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    pub edit: TextEdit,
    pub label: String,
}

/// Ordered, conflict-free edits for one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositePatch {
    primitives: Vec<EditPrimitive>,
    entries: Vec<PatchEntry>,
    groups: Vec<EditGroup>,
}

impl CompositePatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of text-level writes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Primitives in the same position order as [`entries`](Self::entries).
    pub fn primitives(&self) -> &[EditPrimitive] {
        &self.primitives
    }

    /// Writes sorted by start, longer ranges first at equal starts.
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Edit groups sorted by label.
    pub fn groups(&self) -> &[EditGroup] {
        &self.groups
    }
}

/// Gathers operations, invokes each exactly once and merges the result.
#[derive(Default)]
pub struct RewriteAggregator {
    operations: Vec<Box<dyn RewriteOperation>>,
    policy: KeepCommentPolicy,
}

impl RewriteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: KeepCommentPolicy) -> Self {
        Self {
            operations: Vec::new(),
            policy,
        }
    }

    pub fn push(&mut self, operation: impl RewriteOperation + 'static) {
        self.operations.push(Box::new(operation));
    }

    pub fn push_boxed(&mut self, operation: Box<dyn RewriteOperation>) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Aggregate against `tree`; edits target the tree's source text.
    pub fn aggregate(self, tree: &ParseTree) -> Result<CompositePatch, RewriteError> {
        self.run(tree.source(), Some(tree))
    }

    /// Aggregate operations that never look at a tree.
    pub fn aggregate_text(self, text: &str) -> Result<CompositePatch, RewriteError> {
        self.run(text, None)
    }

    fn run(self, text: &str, tree: Option<&ParseTree>) -> Result<CompositePatch, RewriteError> {
        let mut primitives: Vec<EditPrimitive> = Vec::new();
        for operation in &self.operations {
            let mut cx = RewriteContext::new(text, tree, self.policy, operation.label());
            operation.contribute(&mut cx)?;
            primitives.extend(cx.into_primitives());
        }
        primitives.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

        let mut keyed = Vec::new();
        for primitive in &primitives {
            for (seq, edit) in primitive.footprints().into_iter().enumerate() {
                keyed.push((seq, PatchEntry {
                    edit,
                    label: primitive.label().to_string(),
                }));
            }
        }

        // Registration order takes no part, so detector scheduling cannot
        // change the patch.
        keyed.sort_by(|(seq_a, a), (seq_b, b)| {
            let key = |seq: &usize, entry: &PatchEntry| {
                (
                    entry.edit.byte_start,
                    Reverse(entry.edit.range_len()),
                    entry.label.clone(),
                    *seq,
                    entry.edit.new_text.clone(),
                )
            };
            key(seq_a, a).cmp(&key(seq_b, b))
        });
        let entries: Vec<PatchEntry> = keyed.into_iter().map(|(_, entry)| entry).collect();

        check_conflicts(&entries)?;

        let mut by_label: BTreeMap<&str, Vec<TextEdit>> = BTreeMap::new();
        for entry in &entries {
            by_label
                .entry(entry.label.as_str())
                .or_default()
                .push(entry.edit.clone());
        }
        let groups = by_label
            .into_iter()
            .map(|(label, edits)| EditGroup {
                label: label.to_string(),
                edits,
            })
            .collect();

        debug!(
            operations = self.operations.len(),
            edits = entries.len(),
            "aggregated rewrite operations"
        );

        Ok(CompositePatch {
            primitives,
            entries,
            groups,
        })
    }
}

impl Extend<Box<dyn RewriteOperation>> for RewriteAggregator {
    fn extend<I: IntoIterator<Item = Box<dyn RewriteOperation>>>(&mut self, iter: I) {
        self.operations.extend(iter);
    }
}

/// Walk sorted entries, comparing each with the furthest-reaching write
/// seen so far.
fn check_conflicts(entries: &[PatchEntry]) -> Result<(), RewriteError> {
    let mut reach: Option<&PatchEntry> = None;

    for entry in entries {
        if let Some(previous) = reach {
            if previous.edit.overlaps(&entry.edit) {
                debug!(
                    first = %previous.label,
                    second = %entry.label,
                    "conflicting rewrite operations"
                );
                return Err(RewriteError::OperationConflict {
                    first_label: previous.label.clone(),
                    first_range: previous.edit.range(),
                    second_label: entry.label.clone(),
                    second_range: entry.edit.range(),
                });
            }
        }

        if reach.map_or(true, |previous| entry.edit.byte_end > previous.edit.byte_end) {
            reach = Some(entry);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::operation::GroupHandle;
    use std::ops::Range;

    /// Tree-less operation writing fixed ranges.
    struct Raw {
        label: &'static str,
        writes: Vec<(Range<usize>, &'static str)>,
    }

    impl RewriteOperation for Raw {
        fn label(&self) -> &str {
            self.label
        }

        fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
            let group: GroupHandle = cx.default_group();
            for (range, content) in &self.writes {
                cx.replace_range(range.clone(), *content, &group)?;
            }
            Ok(())
        }
    }

    fn raw(label: &'static str, writes: Vec<(Range<usize>, &'static str)>) -> Raw {
        Raw { label, writes }
    }

    #[test]
    fn entries_sorted_and_grouped() {
        let mut aggregator = RewriteAggregator::new();
        aggregator.push(raw("b", vec![(6..11, "WORLD")]));
        aggregator.push(raw("a", vec![(0..5, "HELLO")]));
        let patch = aggregator.aggregate_text("hello world").unwrap();

        let starts: Vec<usize> = patch.entries().iter().map(|e| e.edit.byte_start).collect();
        assert_eq!(starts, vec![0, 6]);
        let labels: Vec<&str> = patch.groups().iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        let ranges: Vec<_> = patch.primitives().iter().map(|p| p.range()).collect();
        assert_eq!(ranges, vec![0..5, 6..11]);
    }

    #[test]
    fn registration_order_does_not_change_the_patch() {
        let build = |first: Raw, second: Raw| {
            let mut aggregator = RewriteAggregator::new();
            aggregator.push(first);
            aggregator.push(second);
            aggregator.aggregate_text("hello world").unwrap()
        };

        let forward = build(raw("a", vec![(0..5, "HELLO")]), raw("b", vec![(6..11, "WORLD")]));
        let backward = build(raw("b", vec![(6..11, "WORLD")]), raw("a", vec![(0..5, "HELLO")]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn touching_ranges_are_allowed() {
        let mut aggregator = RewriteAggregator::new();
        aggregator.push(raw("left", vec![(0..5, "x")]));
        aggregator.push(raw("right", vec![(5..11, "y")]));
        assert_eq!(aggregator.aggregate_text("hello world").unwrap().len(), 2);
    }

    #[test]
    fn overlap_reports_both_labels() {
        let mut aggregator = RewriteAggregator::new();
        aggregator.push(raw("wide", vec![(0..8, "x")]));
        aggregator.push(raw("narrow", vec![(2..3, "y")]));

        match aggregator.aggregate_text("hello world") {
            Err(RewriteError::OperationConflict {
                first_label,
                second_label,
                first_range,
                second_range,
            }) => {
                assert_eq!(first_label, "wide");
                assert_eq!(second_label, "narrow");
                assert_eq!(first_range, 0..8);
                assert_eq!(second_range, 2..3);
            }
            other => panic!("expected conflict, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn insertion_strictly_inside_a_range_conflicts() {
        let mut aggregator = RewriteAggregator::new();
        aggregator.push(raw("outer", vec![(0..10, "x")]));
        aggregator.push(raw("edge", vec![(10..10, "!")]));
        assert_eq!(aggregator.aggregate_text("hello world").unwrap().len(), 2);

        let mut aggregator = RewriteAggregator::new();
        aggregator.push(raw("outer", vec![(0..10, "x")]));
        aggregator.push(raw("inside", vec![(5..5, "!")]));
        assert!(matches!(
            aggregator.aggregate_text("hello world"),
            Err(RewriteError::OperationConflict { .. })
        ));
    }

    #[test]
    fn empty_aggregator_gives_empty_patch() {
        let patch = RewriteAggregator::new().aggregate_text("text").unwrap();
        assert!(patch.is_empty());
        assert!(patch.groups().is_empty());
    }

    #[test]
    fn contribute_errors_propagate_unchanged() {
        struct Failing;
        impl RewriteOperation for Failing {
            fn label(&self) -> &str {
                "failing"
            }
            fn contribute(&self, _cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
                Err(RewriteError::detector("failing", "boom"))
            }
        }

        let mut aggregator = RewriteAggregator::new();
        aggregator.push(Failing);
        let err = aggregator.aggregate_text("x").unwrap_err();
        assert_eq!(err.to_string(), "detector 'failing' failed: boom");
    }
}
