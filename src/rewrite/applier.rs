use crate::edit::{splice, TextEdit};
use crate::rewrite::aggregator::{CompositePatch, EditGroup};
use crate::rewrite::errors::RewriteError;

/// Result of applying a [`CompositePatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub text: String,
    pub groups: Vec<EditGroup>,
    /// Whether `text` differs from the input
    pub changed: bool,
}

/// Applies a composite patch to the text it was computed against.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchApplier;

impl PatchApplier {
    pub fn new() -> Self {
        PatchApplier
    }

    /// Apply every write in one pass, or none of them.
    ///
    /// Any write that falls outside `text`, splits a character or finds
    /// text other than what it was computed against fails with
    /// [`RewriteError::StaleTree`].
    pub fn apply(&self, text: &str, patch: &CompositePatch) -> Result<AppliedPatch, RewriteError> {
        let mut edits: Vec<&TextEdit> = patch.entries().iter().map(|entry| &entry.edit).collect();
        // Insertions go in front of a range starting at the same offset.
        edits.sort_by_key(|edit| (edit.byte_start, !edit.is_insertion()));
        let edits: Vec<TextEdit> = edits.into_iter().cloned().collect();

        let new_text = splice(text, &edits)?;
        let changed = new_text != text;

        Ok(AppliedPatch {
            text: new_text,
            groups: patch.groups().to_vec(),
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::aggregator::RewriteAggregator;
    use crate::rewrite::operation::{RewriteContext, RewriteOperation};
    use std::ops::Range;

    struct Write(Range<usize>, &'static str);

    impl RewriteOperation for Write {
        fn label(&self) -> &str {
            "write"
        }

        fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
            let group = cx.default_group();
            cx.replace_range(self.0.clone(), self.1, &group)
        }
    }

    fn patch_for(text: &str, writes: Vec<Write>) -> CompositePatch {
        let mut aggregator = RewriteAggregator::new();
        for write in writes {
            aggregator.push(write);
        }
        aggregator.aggregate_text(text).unwrap()
    }

    #[test]
    fn empty_patch_is_identity() {
        let text = "fn main() {}\n";
        let applied = PatchApplier::new()
            .apply(text, &CompositePatch::default())
            .unwrap();
        assert_eq!(applied.text, text);
        assert!(!applied.changed);
        assert!(applied.groups.is_empty());
    }

    #[test]
    fn insertion_lands_before_range_at_same_offset() {
        let text = "foo(bar)";
        let patch = patch_for(text, vec![Write(4..7, "baz"), Write(4..4, "&")]);
        let applied = PatchApplier::new().apply(text, &patch).unwrap();
        assert_eq!(applied.text, "foo(&baz)");
        assert!(applied.changed);
        assert_eq!(applied.groups.len(), 1);
        assert_eq!(applied.groups[0].edits.len(), 2);
    }

    #[test]
    fn stale_text_is_rejected_without_partial_output() {
        let patch = patch_for("hello world", vec![Write(0..5, "HELLO"), Write(6..11, "WORLD")]);
        let err = PatchApplier::new().apply("hello there", &patch).unwrap_err();
        assert!(matches!(err, RewriteError::StaleTree { .. }));

        let err = PatchApplier::new().apply("hi", &patch).unwrap_err();
        assert!(matches!(err, RewriteError::StaleTree { .. }));
    }
}
