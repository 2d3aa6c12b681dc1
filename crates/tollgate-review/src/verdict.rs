use tollgate_core::Verdict;

/// Sentinel the reviewer emits when the change must not merge as-is.
pub const SENTINEL_BLOCKING: &str = "BLOCKING: YES";
/// Sentinel the reviewer emits when nothing blocks the change.
pub const SENTINEL_NON_BLOCKING: &str = "BLOCKING: NO";

/// Derive the verdict from free-form review text.
///
/// Any occurrence of the blocking sentinel makes the review blocking, even if
/// the non-blocking sentinel also appears.
///
/// # Examples
///
/// ```
/// use tollgate_core::Verdict;
/// use tollgate_review::verdict::parse_verdict;
///
/// assert_eq!(parse_verdict("Null deref in foo().\nBLOCKING: YES"), Verdict::Blocking);
/// assert_eq!(parse_verdict("All good.\nBLOCKING: NO"), Verdict::NonBlocking);
/// assert_eq!(parse_verdict("All good."), Verdict::Unparseable);
/// ```
pub fn parse_verdict(review: &str) -> Verdict {
    if review.contains(SENTINEL_BLOCKING) {
        Verdict::Blocking
    } else if review.contains(SENTINEL_NON_BLOCKING) {
        Verdict::NonBlocking
    } else {
        Verdict::Unparseable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_anywhere_in_text() {
        let review = "1. `unwrap()` on user input panics.\n\n**BLOCKING: YES**";
        assert_eq!(parse_verdict(review), Verdict::Blocking);
    }

    #[test]
    fn blocking_sentinel_anywhere_outweighs_trailing_no() {
        let review = "Flagged BLOCKING: YES on the unchecked index in parse().\nBLOCKING: NO";
        assert_eq!(parse_verdict(review), Verdict::Blocking);
        assert!(parse_verdict(review).requires_label());
        let review = "Not BLOCKING: NO after all.\nBLOCKING: YES";
        assert_eq!(parse_verdict(review), Verdict::Blocking);
    }

    #[test]
    fn case_sensitive() {
        assert_eq!(parse_verdict("blocking: yes"), Verdict::Unparseable);
    }

    #[test]
    fn empty_review_is_unparseable() {
        assert_eq!(parse_verdict(""), Verdict::Unparseable);
    }
}
