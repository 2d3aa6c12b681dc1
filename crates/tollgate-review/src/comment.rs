/// Substring that identifies the comment owned by tollgate.
pub const COMMENT_MARKER: &str = "Tollgate AI Code Review";
/// First line of every review comment; contains [`COMMENT_MARKER`].
pub const COMMENT_HEADER: &str = "## \u{1f916} Tollgate AI Code Review";
/// Last line of every review comment.
pub const COMMENT_FOOTER: &str = "*This review was generated automatically by Tollgate.*";

/// Render the marked comment body around the review text.
///
/// # Examples
///
/// ```
/// use tollgate_review::comment::{render_comment, COMMENT_MARKER};
///
/// let body = render_comment("Looks fine.\nBLOCKING: NO");
/// assert!(body.contains(COMMENT_MARKER));
/// assert!(body.contains("\n\nLooks fine.\nBLOCKING: NO\n\n"));
/// ```
pub fn render_comment(review: &str) -> String {
    format!("{COMMENT_HEADER}\n\n{review}\n\n{COMMENT_FOOTER}\n")
}

/// Review text posted instead of an LLM review when the diff is too large.
pub fn oversize_message(max_chars: usize) -> String {
    format!(
        "Skipped automated review: the diff exceeds the maximum size of {max_chars} characters."
    )
}
