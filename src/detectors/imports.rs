use crate::detectors::{Operations, ScanInput};
use crate::rewrite::{RewriteContext, RewriteError, RewriteOperation};
use crate::trivia::whole_line;
use std::ops::Range;

const LINT: &str = "unused_imports";
const REMOVE_WHOLE_LINE: &str = "remove_whole_line";

/// Works purely from the compiler's byte ranges; never needs a tree.
struct RemoveUnusedImport {
    label: String,
    range: Range<usize>,
    replacement: String,
    whole_line: bool,
}

impl RewriteOperation for RemoveUnusedImport {
    fn label(&self) -> &str {
        &self.label
    }

    fn contribute(&self, cx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let group = cx.default_group();
        let range = match (self.whole_line, self.replacement.is_empty()) {
            (true, true) => cx
                .text()
                .get(self.range.clone())
                .and_then(|_| whole_line(cx.text(), self.range.clone()))
                .unwrap_or_else(|| self.range.clone()),
            _ => self.range.clone(),
        };
        cx.replace_range(range, self.replacement.as_str(), &group)
    }
}

pub(super) fn scan_unused_imports(
    input: &ScanInput<'_>,
    out: &mut Operations,
) -> Result<(), RewriteError> {
    let whole_line = input.options.flag(REMOVE_WHOLE_LINE, true);

    for record in input.diagnostics.iter().filter(|r| r.kind == LINT) {
        out.push(Box::new(RemoveUnusedImport {
            label: input.label.to_string(),
            range: record.range(),
            replacement: record.replacement.clone().unwrap_or_default(),
            whole_line,
        }));
    }

    Ok(())
}
