use tollgate_core::{
    CommentAction, Config, LabelAction, Outcome, PullRequestRef, TollgateError, Verdict,
};
use tracing::{info, warn};

use crate::comment::{oversize_message, render_comment, COMMENT_MARKER};
use crate::github::GitHubClient;
use crate::llm::Reviewer;
use crate::verdict::parse_verdict;

/// Drives one review run against a single pull request.
///
/// Fetch diff, size gate, review, publish the marked comment, then reconcile
/// the blocking label. Each step either succeeds or the run stops with the
/// step's error; nothing is retried at this level.
pub struct Annotator<'a, R: Reviewer> {
    config: &'a Config,
    github: &'a GitHubClient,
    reviewer: &'a R,
}

impl<'a, R: Reviewer> Annotator<'a, R> {
    /// Create an annotator over the given collaborators.
    pub fn new(config: &'a Config, github: &'a GitHubClient, reviewer: &'a R) -> Self {
        Self {
            config,
            github,
            reviewer,
        }
    }

    /// Run the full review flow.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the GitHub client or the reviewer.
    pub async fn run(&self) -> Result<Outcome, TollgateError> {
        let pr = &self.config.pr;

        info!(%pr, "fetching PR diff");
        let diff = self.github.fetch_diff(pr).await?;

        let diff_chars = diff.chars().count();
        let max = self.config.review.max_diff_chars;
        if diff_chars > max {
            warn!(diff_chars, max, "diff too large, skipping automated review");
            let comment = self.publish(&oversize_message(max)).await?;
            info!("checking label");
            let label = reconcile_label(self.github, pr, &self.config.review.label, false).await?;
            return Ok(Outcome::SkippedOversize {
                diff_chars,
                comment,
                label,
            });
        }

        info!(diff_chars, "reviewing diff");
        let review = self.reviewer.review_diff(&diff).await?;

        info!("posting review comment");
        let comment = self.publish(&review).await?;

        let verdict = parse_verdict(&review);
        if verdict == Verdict::Unparseable {
            warn!("review has no BLOCKING sentinel; treating as non-blocking");
        }
        info!(%verdict, "checking label");
        let label = reconcile_label(
            self.github,
            pr,
            &self.config.review.label,
            verdict.requires_label(),
        )
        .await?;

        Ok(Outcome::Reviewed {
            verdict,
            comment,
            label,
        })
    }

    /// Upsert the marked comment with `review` wrapped in the comment template.
    ///
    /// # Errors
    ///
    /// Propagates GitHub client failures.
    pub async fn publish(&self, review: &str) -> Result<CommentAction, TollgateError> {
        self.github
            .upsert_comment(&self.config.pr, COMMENT_MARKER, &render_comment(review))
            .await
    }
}

/// Bring the label on `pr` to the target state.
///
/// Reads the current labels first so an already-correct state issues no
/// mutation.
///
/// # Errors
///
/// Propagates GitHub client failures.
pub async fn reconcile_label(
    github: &GitHubClient,
    pr: &PullRequestRef,
    label: &str,
    present: bool,
) -> Result<LabelAction, TollgateError> {
    let labels = github.list_labels(pr).await?;
    let has_label = labels.iter().any(|l| l == label);
    let action = match (present, has_label) {
        (true, false) => {
            github.add_label(pr, label).await?;
            LabelAction::Added
        }
        (false, true) => {
            github.remove_label(pr, label).await?;
            LabelAction::Removed
        }
        _ => LabelAction::Unchanged,
    };
    Ok(action)
}

/// Delete the marked comment and remove the blocking label, if present.
///
/// # Errors
///
/// Propagates GitHub client failures.
pub async fn clear(config: &Config, github: &GitHubClient) -> Result<Outcome, TollgateError> {
    let pr = &config.pr;
    let comment = match github.find_marked_comment(pr, COMMENT_MARKER).await? {
        Some(id) => {
            github.delete_comment(pr, id).await?;
            CommentAction::Deleted(id)
        }
        None => CommentAction::Unchanged,
    };
    let label = reconcile_label(github, pr, &config.review.label, false).await?;
    info!(%pr, "cleared review state");
    Ok(Outcome::Cleared { comment, label })
}
