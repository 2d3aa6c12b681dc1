use crate::verdict::{SENTINEL_BLOCKING, SENTINEL_NON_BLOCKING};

const INSTRUCTIONS: &str = "\
You are a pull request review bot, not a coding tutor.

Rules:
- Only comment on problems that actually exist in this diff
- If there are no significant problems, say plainly that no blocking issues were found
- Do not restate the code
- Do not give generic advice
- Do not suggest adding tests unless the diff clearly breaks existing test logic
- This review runs automatically on pull requests targeting the main branch

Focus on:
- Changes that will cause bugs
- Changes that reduce maintainability
- Departures from the project's established style or conventions";

/// Build the review prompt for a diff.
///
/// The diff is embedded verbatim in a fenced block, and the prompt requires
/// the response to end with one of the two sentinel lines.
///
/// # Examples
///
/// ```
/// use tollgate_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("+let x = 1;");
/// assert!(prompt.contains("```diff\n+let x = 1;\n```"));
/// assert!(prompt.trim_end().ends_with("BLOCKING: YES or BLOCKING: NO"));
/// ```
pub fn build_review_prompt(diff: &str) -> String {
    format!(
        "{INSTRUCTIONS}\n\n\
         The code changes are:\n\
         ```diff\n{diff}\n```\n\n\
         On the very last line, output exactly one of:\n\
         {SENTINEL_BLOCKING} or {SENTINEL_NON_BLOCKING}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_diff_verbatim() {
        let diff = "diff --git a/x b/x\n@@ -1 +1 @@\n-old\n+new";
        let prompt = build_review_prompt(diff);
        assert!(prompt.contains(diff));
    }

    #[test]
    fn names_both_sentinels() {
        let prompt = build_review_prompt("");
        assert!(prompt.contains("BLOCKING: YES"));
        assert!(prompt.contains("BLOCKING: NO"));
    }
}
