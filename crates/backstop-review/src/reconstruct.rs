//! Recover pre-edit content from post-edit content and the edit list.

use backstop_core::EditPair;

/// Recovers the content a file had before `edits` were applied in order.
pub trait Reconstructor {
    fn reconstruct_previous(&self, post: &str, edits: &[EditPair]) -> String;
}

/// Literal reverse substitution.
///
/// Walks the edits last-to-first and replaces every occurrence of
/// `new_string` with `old_string`. This is exact only when each
/// `new_string` is a unique, non-overlapping substring of the content at the
/// time it is reversed. If `new_string` also occurs elsewhere, every
/// occurrence is substituted and the result over-reverts; callers must
/// accept that imprecision. An empty `new_string` (a pure deletion) has no
/// anchor in the post content, so that edit is skipped and its removed text
/// is not recovered.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralReverse;

impl Reconstructor for LiteralReverse {
    fn reconstruct_previous(&self, post: &str, edits: &[EditPair]) -> String {
        let mut content = post.to_string();
        for edit in edits.iter().rev() {
            if edit.new_string.is_empty() {
                tracing::debug!(
                    old_len = edit.old_string.len(),
                    "skipping deletion edit with no anchor"
                );
                continue;
            }
            content = content.replace(&edit.new_string, &edit.old_string);
        }
        content
    }
}
