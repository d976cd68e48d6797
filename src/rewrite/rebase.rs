//! Carrying edits made against a patched text back onto the text the patch
//! was applied to.
//!
//! A later round of rewrites sees the output of an earlier one. Its edits are
//! rebased here so that every [`EditGroup`] handed out for one unit speaks
//! about the same, original bytes.

use crate::edit::TextEdit;
use crate::rewrite::aggregator::{CompositePatch, EditGroup};
use std::ops::Range;

/// Where one write of the earlier patch sits before and after applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    original: Range<usize>,
    edited: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Start,
    End,
}

/// Offset map from a patch's output back to its input.
#[derive(Debug)]
pub struct OffsetMap<'a> {
    original: &'a str,
    edited: &'a str,
    segments: Vec<Segment>,
}

impl<'a> OffsetMap<'a> {
    /// `edited` must be the result of applying `patch` to `original`.
    pub fn new(original: &'a str, edited: &'a str, patch: &CompositePatch) -> Self {
        let mut writes: Vec<&TextEdit> = patch.entries().iter().map(|entry| &entry.edit).collect();
        writes.sort_by_key(|edit| (edit.byte_start, !edit.is_insertion()));

        let mut grown = 0;
        let mut shrunk = 0;
        let segments = writes
            .into_iter()
            .map(|edit| {
                let start = edit.byte_start + grown - shrunk;
                grown += edit.new_text.len();
                shrunk += edit.range_len();
                Segment {
                    original: edit.range(),
                    edited: start..start + edit.new_text.len(),
                }
            })
            .collect();

        Self {
            original,
            edited,
            segments,
        }
    }

    /// Original offset of edited offset `at`.
    ///
    /// Text written by the patch has no original counterpart; an endpoint
    /// inside it maps to the matching end of the write it came from.
    fn to_original(&self, at: usize, endpoint: Endpoint) -> usize {
        let (mut original, mut edited) = (0, 0);
        for segment in &self.segments {
            let at_start = at == segment.edited.start;
            // Starts move past a deletion at `at`, ends stay in front of it
            if at < segment.edited.start
                || (at_start && (endpoint == Endpoint::End || !segment.edited.is_empty()))
            {
                break;
            }
            if at < segment.edited.end {
                return match endpoint {
                    Endpoint::Start => segment.original.start,
                    Endpoint::End => segment.original.end,
                };
            }
            original = segment.original.end;
            edited = segment.edited.end;
        }
        original + (at - edited)
    }

    /// `edit`, made against the edited text, as a write on the original.
    ///
    /// An edit reaching into text the patch wrote absorbs that write: its
    /// range grows to the original bytes beneath it and its new text is
    /// what the two writes produce together. The result may therefore
    /// overlap a write of the patch itself.
    pub fn rebase(&self, edit: &TextEdit) -> TextEdit {
        let (start, end) = (edit.byte_start, edit.byte_end);
        let end_side = if edit.is_insertion() {
            Endpoint::Start
        } else {
            Endpoint::End
        };
        let mut original = self.to_original(start, Endpoint::Start)..self.to_original(end, end_side);
        let mut edited = start..end;

        let touched = self.segments.iter().filter(|segment| {
            !segment.edited.is_empty() && segment.edited.start < end && start < segment.edited.end
        });
        for segment in touched {
            original.start = original.start.min(segment.original.start);
            original.end = original.end.max(segment.original.end);
            edited.start = edited.start.min(segment.edited.start);
            edited.end = edited.end.max(segment.edited.end);
        }

        let new_text = format!(
            "{}{}{}",
            &self.edited[edited.start..start],
            edit.new_text,
            &self.edited[end..edited.end]
        );
        let before = &self.original[original.clone()];
        TextEdit::new(original, new_text, before)
    }

    /// Rebase every edit of `groups`, dropping edits that cancel out.
    pub fn rebase_groups(&self, groups: Vec<EditGroup>) -> Vec<EditGroup> {
        groups
            .into_iter()
            .map(|group| EditGroup {
                edits: group
                    .edits
                    .iter()
                    .map(|edit| self.rebase(edit))
                    .filter(|edit| !(edit.is_insertion() && edit.new_text.is_empty()))
                    .collect(),
                label: group.label,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{PatchApplier, RewriteAggregator, RewriteContext, RewriteError, RewriteOperation};

    struct Write(Range<usize>, &'static str);

    impl RewriteOperation for Write {
        fn label(&self) -> &str {
            "first"
        }

        fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
            let group = cx.default_group();
            cx.replace_range(self.0.clone(), self.1, &group)
        }
    }

    fn patched(original: &str, writes: Vec<Write>) -> (CompositePatch, String) {
        let mut aggregator = RewriteAggregator::new();
        for write in writes {
            aggregator.push(write);
        }
        let patch = aggregator.aggregate_text(original).unwrap();
        let edited = PatchApplier::new().apply(original, &patch).unwrap().text;
        (patch, edited)
    }

    fn edit_on(text: &str, range: Range<usize>, new_text: &str) -> TextEdit {
        TextEdit::new(range.clone(), new_text, &text[range])
    }

    #[test]
    fn untouched_text_shifts_back() {
        let original = "aaaa bb cc";
        let (patch, edited) = patched(original, vec![Write(0..4, "a")]);
        assert_eq!(edited, "a bb cc");

        let map = OffsetMap::new(original, &edited, &patch);
        let rebased = map.rebase(&edit_on(&edited, 5..7, "CC"));
        assert_eq!(rebased.range(), 8..10);
        assert!(rebased.expected_before.matches("cc"));
        assert_eq!(rebased.new_text, "CC");
    }

    #[test]
    fn edit_next_to_a_deletion_does_not_absorb_it() {
        let original = "x;;;; y";
        let (patch, edited) = patched(original, vec![Write(1..5, "")]);
        assert_eq!(edited, "x y");

        let map = OffsetMap::new(original, &edited, &patch);
        assert_eq!(map.rebase(&edit_on(&edited, 1..2, "")).range(), 5..6);
        assert_eq!(map.rebase(&edit_on(&edited, 0..1, "z")).range(), 0..1);
    }

    #[test]
    fn edit_inside_written_text_absorbs_the_write() {
        let original = "if x == false";
        let (patch, edited) = patched(original, vec![Write(3..3, "!"), Write(4..13, "")]);
        assert_eq!(edited, "if !x");

        let map = OffsetMap::new(original, &edited, &patch);
        // Dropping the `!` again cancels out on the original
        let rebased = map.rebase(&edit_on(&edited, 3..4, ""));
        assert!(rebased.is_insertion() && rebased.new_text.is_empty());

        let widened = map.rebase(&edit_on(&edited, 3..5, "y"));
        assert_eq!(widened.range(), 3..4);
        assert_eq!(widened.new_text, "y");
        assert!(widened.expected_before.matches("x"));
    }

    #[test]
    fn insertion_inside_replacement_becomes_a_replacement() {
        let original = "foo(bar)";
        let (patch, edited) = patched(original, vec![Write(4..7, "bazz")]);
        assert_eq!(edited, "foo(bazz)");

        let map = OffsetMap::new(original, &edited, &patch);
        let rebased = map.rebase(&TextEdit::insertion(6, "_"));
        assert_eq!(rebased.range(), 4..7);
        assert_eq!(rebased.new_text, "ba_zz");
    }
}
