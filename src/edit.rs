use std::cmp::Reverse;
use std::ops::Range;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => {
                let actual_hash = xxh3_64(text.as_bytes());
                actual_hash == *expected_hash
            }
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }

    /// Get hash value regardless of variant.
    pub fn hash(&self) -> u64 {
        match self {
            EditVerification::Hash(h) => *h,
            EditVerification::ExactMatch(text) => xxh3_64(text.as_bytes()),
        }
    }
}

/// One text-level write: replace `[byte_start, byte_end)` with `new_text`.
///
/// Every [`EditPrimitive`] compiles down to one or two of these. Offsets are
/// always in the coordinate space of the original, unedited text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

impl TextEdit {
    pub fn new(range: Range<usize>, new_text: impl Into<String>, expected_before: &str) -> Self {
        Self {
            byte_start: range.start,
            byte_end: range.end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Zero-width write at `at`.
    pub fn insertion(at: usize, new_text: impl Into<String>) -> Self {
        Self::new(at..at, new_text, "")
    }

    pub fn range(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }

    pub fn range_len(&self) -> usize {
        self.byte_end - self.byte_start
    }

    pub fn is_insertion(&self) -> bool {
        self.byte_start == self.byte_end
    }

    /// Whether the two writes claim overlapping text.
    ///
    /// Touching ranges do not overlap. An insertion overlaps a range only when
    /// it falls strictly inside it; insertions never overlap each other.
    pub fn overlaps(&self, other: &TextEdit) -> bool {
        match (self.is_insertion(), other.is_insertion()) {
            (true, true) => false,
            (true, false) => other.byte_start < self.byte_start && self.byte_start < other.byte_end,
            (false, true) => self.byte_start < other.byte_start && other.byte_start < self.byte_end,
            (false, false) => self.byte_start < other.byte_end && other.byte_start < self.byte_end,
        }
    }

    /// Validate the edit against `text`.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    fn validate<'a>(&self, text: &'a str) -> Result<&'a str, SpliceError> {
        if self.byte_start > self.byte_end || self.byte_end > text.len() {
            return Err(SpliceError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                text_len: text.len(),
            });
        }

        let current = text.get(self.byte_start..self.byte_end).ok_or(
            SpliceError::NotCharBoundary {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            },
        )?;

        if !self.expected_before.matches(current) {
            return Err(SpliceError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("Invalid byte range: [{byte_start}, {byte_end}) in text of length {text_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },

    #[error("Byte range [{byte_start}, {byte_end}) splits a UTF-8 character")]
    NotCharBoundary { byte_start: usize, byte_end: usize },

    #[error("Before-text verification failed at {byte_start}..{byte_end}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Edits [{first_start}, {first_end}) and [{second_start}, {second_end}) overlap or are out of order")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

/// Apply writes, given in output order, to `text` in one pass.
///
/// Output order is ascending by start offset, with insertions at an offset
/// placed before a range starting at the same offset. All writes are
/// validated before any is applied, then spliced bottom-to-top so earlier
/// offsets stay valid. The input is left untouched.
pub fn splice(text: &str, edits: &[TextEdit]) -> Result<String, SpliceError> {
    for edit in edits {
        edit.validate(text)?;
    }

    let mut previous: Option<&TextEdit> = None;
    for edit in edits {
        if let Some(prev) = previous {
            if edit.byte_start < prev.byte_end || edit.byte_start < prev.byte_start {
                return Err(SpliceError::Overlap {
                    first_start: prev.byte_start,
                    first_end: prev.byte_end,
                    second_start: edit.byte_start,
                    second_end: edit.byte_end,
                });
            }
        }
        previous = Some(edit);
    }

    let inserted: usize = edits.iter().map(|e| e.new_text.len()).sum();
    let mut result = String::with_capacity(text.len() + inserted);
    result.push_str(text);
    for edit in edits.iter().rev() {
        result.replace_range(edit.range(), &edit.new_text);
    }

    Ok(result)
}

/// The shape of one edit primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    Insert {
        at: usize,
        content: String,
    },
    Delete {
        range: Range<usize>,
    },
    Replace {
        range: Range<usize>,
        content: String,
    },
    /// `text` is the source range's content captured when the primitive was
    /// created, so later edits inside the source cannot leak into the copy.
    MoveOrCopy {
        source: Range<usize>,
        dest: usize,
        text: String,
        is_copy: bool,
    },
}

/// Atomic, immutable edit request tagged with the edit-group label that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditPrimitive does nothing until it is aggregated or applied"]
pub struct EditPrimitive {
    kind: EditKind,
    label: String,
    /// Verification of the original text under the write (or move source) range
    expected_before: EditVerification,
}

impl EditPrimitive {
    pub fn insert(at: usize, content: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Insert {
                at,
                content: content.into(),
            },
            label: label.into(),
            expected_before: EditVerification::from_text(""),
        }
    }

    pub fn delete(range: Range<usize>, original: &str, label: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Delete { range },
            label: label.into(),
            expected_before: EditVerification::from_text(original),
        }
    }

    pub fn replace(
        range: Range<usize>,
        original: &str,
        content: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            kind: EditKind::Replace {
                range,
                content: content.into(),
            },
            label: label.into(),
            expected_before: EditVerification::from_text(original),
        }
    }

    /// Move (or copy) `source` to `dest`, carrying `text` captured now.
    pub fn move_or_copy(
        source: Range<usize>,
        text: impl Into<String>,
        dest: usize,
        is_copy: bool,
        label: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            expected_before: EditVerification::from_text(&text),
            kind: EditKind::MoveOrCopy {
                source,
                dest,
                text,
                is_copy,
            },
            label: label.into(),
        }
    }

    pub fn kind(&self) -> &EditKind {
        &self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Original-text range this primitive targets. For moves and copies this
    /// is the source range.
    pub fn range(&self) -> Range<usize> {
        match &self.kind {
            EditKind::Insert { at, .. } => *at..*at,
            EditKind::Delete { range } | EditKind::Replace { range, .. } => range.clone(),
            EditKind::MoveOrCopy { source, .. } => source.clone(),
        }
    }

    /// The text-level writes this primitive performs, in output order.
    ///
    /// A move whose destination lies inside its own source collapses onto
    /// the source start, which leaves the text where it was.
    pub fn footprints(&self) -> Vec<TextEdit> {
        let verified = |range: Range<usize>, new_text: &str| TextEdit {
            byte_start: range.start,
            byte_end: range.end,
            new_text: new_text.to_string(),
            expected_before: self.expected_before.clone(),
        };

        match &self.kind {
            EditKind::Insert { at, content } => vec![TextEdit::insertion(*at, content.clone())],
            EditKind::Delete { range } => vec![verified(range.clone(), "")],
            EditKind::Replace { range, content } => vec![verified(range.clone(), content)],
            EditKind::MoveOrCopy {
                text, dest, is_copy: true, ..
            } => vec![TextEdit::insertion(*dest, text.clone())],
            EditKind::MoveOrCopy {
                source,
                dest,
                text,
                is_copy: false,
            } => {
                let dest = if source.start < *dest && *dest < source.end {
                    source.start
                } else {
                    *dest
                };
                let removal = verified(source.clone(), "");
                let landing = TextEdit::insertion(dest, text.clone());
                if dest <= source.start {
                    vec![landing, removal]
                } else {
                    vec![removal, landing]
                }
            }
        }
    }

    /// Total order used to lay primitives out independently of the order
    /// they were contributed in: position, longer ranges first, then label
    /// and content.
    pub fn order_key(&self) -> (usize, Reverse<usize>, &str, u8, usize, &str) {
        let range = self.range();
        let (tag, dest, content) = match &self.kind {
            EditKind::Insert { at, content } => (0, *at, content.as_str()),
            EditKind::Delete { range } => (1, range.start, ""),
            EditKind::Replace { range, content } => (2, range.start, content.as_str()),
            EditKind::MoveOrCopy {
                dest, text, is_copy, ..
            } => (3 + u8::from(*is_copy), *dest, text.as_str()),
        };
        (range.start, Reverse(range.len()), self.label.as_str(), tag, dest, content)
    }

    /// Apply this primitive alone to `text` (original coordinates).
    pub fn apply(&self, text: &str) -> Result<String, SpliceError> {
        splice(text, &self.footprints())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_verification_exact_match() {
        let text = "hello world";
        let verify = EditVerification::ExactMatch(text.to_string());
        assert!(verify.matches(text));
        assert!(!verify.matches("hello"));
    }

    #[test]
    fn test_edit_verification_hash() {
        let text = "hello world";
        let hash = xxh3_64(text.as_bytes());
        let verify = EditVerification::Hash(hash);
        assert!(verify.matches(text));
        assert!(!verify.matches("goodbye world"));
    }

    #[test]
    fn test_edit_verification_from_text_large() {
        let text = "x".repeat(2000);
        let verify = EditVerification::from_text(&text);
        assert!(matches!(verify, EditVerification::Hash(_)));
        assert_eq!(verify.hash(), xxh3_64(text.as_bytes()));
    }

    #[test]
    fn test_splice_multiple_edits() {
        let text = "line1\nline2\nline3\n";
        let edits = vec![
            TextEdit::new(0..5, "LINE1", "line1"),
            TextEdit::new(6..11, "LINE2", "line2"),
            TextEdit::new(12..17, "LINE3", "line3"),
        ];
        assert_eq!(splice(text, &edits).unwrap(), "LINE1\nLINE2\nLINE3\n");
    }

    #[test]
    fn test_splice_insertion_before_replacement_at_same_offset() {
        let text = "foo(bar)";
        let edits = vec![
            TextEdit::insertion(4, "&"),
            TextEdit::new(4..7, "baz", "bar"),
        ];
        assert_eq!(splice(text, &edits).unwrap(), "foo(&baz)");
    }

    #[test]
    fn test_splice_keeps_insertion_order() {
        let text = "ab";
        let edits = vec![TextEdit::insertion(1, "1"), TextEdit::insertion(1, "2")];
        assert_eq!(splice(text, &edits).unwrap(), "a12b");
    }

    #[test]
    fn test_splice_rejects_invalid_range() {
        let edits = vec![TextEdit::new(5..20, "replacement", "")];
        assert!(matches!(
            splice("hello world", &edits),
            Err(SpliceError::InvalidByteRange { text_len: 11, .. })
        ));
    }

    #[test]
    fn test_splice_rejects_split_character() {
        let edits = vec![TextEdit::new(1..2, "x", "")];
        assert!(matches!(
            splice("héllo", &edits),
            Err(SpliceError::NotCharBoundary { .. })
        ));
    }

    #[test]
    fn test_splice_rejects_before_text_mismatch() {
        let edits = vec![TextEdit::new(0..5, "HELLO", "howdy")];
        let err = splice("hello world", &edits).unwrap_err();
        assert!(matches!(err, SpliceError::BeforeTextMismatch { ref found, .. } if found == "hello"));
    }

    #[test]
    fn test_splice_rejects_overlap() {
        let edits = vec![
            TextEdit::new(0..5, "a", "hello"),
            TextEdit::new(3..8, "b", "lo wo"),
        ];
        assert!(matches!(
            splice("hello world", &edits),
            Err(SpliceError::Overlap { .. })
        ));
    }

    #[test]
    fn test_overlap_rules() {
        let range = TextEdit::new(2..6, "", "");
        assert!(range.overlaps(&TextEdit::insertion(4, "x")));
        assert!(!range.overlaps(&TextEdit::insertion(2, "x")));
        assert!(!range.overlaps(&TextEdit::insertion(6, "x")));
        assert!(!range.overlaps(&TextEdit::new(6..8, "", "")));
        assert!(range.overlaps(&TextEdit::new(5..8, "", "")));
        assert!(!TextEdit::insertion(3, "a").overlaps(&TextEdit::insertion(3, "b")));
    }

    #[test]
    fn test_primitive_replace_and_delete() {
        let text = "let x = !!y;";
        let replace = EditPrimitive::replace(8..11, "!!y", "y", "Remove double negation");
        assert_eq!(replace.apply(text).unwrap(), "let x = y;");
        assert_eq!(replace.range(), 8..11);
        assert_eq!(replace.label(), "Remove double negation");

        let delete = EditPrimitive::delete(3..5, " x", "drop");
        assert_eq!(delete.apply(text).unwrap(), "let = !!y;");
    }

    #[test]
    fn test_primitive_move_forward_and_backward() {
        let text = "[a][b][c]";
        let forward = EditPrimitive::move_or_copy(0..3, "[a]", 9, false, "move");
        assert_eq!(forward.apply(text).unwrap(), "[b][c][a]");

        let backward = EditPrimitive::move_or_copy(6..9, "[c]", 0, false, "move");
        assert_eq!(backward.apply(text).unwrap(), "[c][a][b]");
    }

    #[test]
    fn test_primitive_copy_keeps_source() {
        let text = "[a][b]";
        let copy = EditPrimitive::move_or_copy(0..3, "[a]", 6, true, "copy");
        assert_eq!(copy.footprints().len(), 1);
        assert_eq!(copy.apply(text).unwrap(), "[a][b][a]");
    }

    #[test]
    fn test_primitive_move_into_itself_is_identity() {
        let text = "[abc]";
        let inner = EditPrimitive::move_or_copy(0..5, "[abc]", 2, false, "move");
        assert_eq!(inner.apply(text).unwrap(), text);
    }

    #[test]
    fn test_primitive_detects_stale_move_source() {
        let moved = EditPrimitive::move_or_copy(0..3, "[a]", 6, false, "move");
        assert!(matches!(
            moved.apply("[x][b]"),
            Err(SpliceError::BeforeTextMismatch { .. })
        ));
    }
}
