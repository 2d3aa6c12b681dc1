use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TollgateError;

/// A pull request on the host, identified by `owner/repo` and number.
///
/// # Examples
///
/// ```
/// use tollgate_core::PullRequestRef;
///
/// let pr = PullRequestRef::from_url("octocat", "hello-world", "https://github.com/octocat/hello-world/pull/42").unwrap();
/// assert_eq!(pr.number, 42);
/// assert_eq!(pr.to_string(), "octocat/hello-world#42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
}

impl PullRequestRef {
    /// Build a reference from the owner, repo and a PR URL whose final path
    /// segment is the pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Config`] if the last segment is not a number.
    pub fn from_url(owner: &str, repo: &str, pr_url: &str) -> Result<Self, TollgateError> {
        let segment = pr_url
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let number: u64 = segment.parse().map_err(|_| {
            TollgateError::Config(format!(
                "invalid pull request reference '{pr_url}': last path segment '{segment}' is not a number"
            ))
        })?;
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Verdict derived from the sentinel line of a review.
///
/// # Examples
///
/// ```
/// use tollgate_core::Verdict;
///
/// assert!(Verdict::Blocking.requires_label());
/// assert!(!Verdict::Unparseable.requires_label());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The reviewer declared the change blocking.
    Blocking,
    /// The reviewer declared the change non-blocking.
    NonBlocking,
    /// Neither sentinel was found in the review text.
    Unparseable,
}

impl Verdict {
    /// Whether the blocking label should be present for this verdict.
    ///
    /// Only an explicit blocking sentinel attaches the label.
    pub fn requires_label(self) -> bool {
        matches!(self, Self::Blocking)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::NonBlocking => write!(f, "non-blocking"),
            Self::Unparseable => write!(f, "unparseable"),
        }
    }
}

/// The single mutation applied to the marked comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "action", content = "id")]
pub enum CommentAction {
    /// A new marked comment was created with this id.
    Created(u64),
    /// The existing marked comment with this id was updated in place.
    Updated(u64),
    /// The marked comment with this id was deleted.
    Deleted(u64),
    /// There was nothing to do.
    Unchanged,
}

/// How the blocking label was reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelAction {
    /// The label was attached.
    Added,
    /// The label was removed.
    Removed,
    /// The label was already in the target state.
    Unchanged,
}

/// Result of a completed annotator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum Outcome {
    /// The diff was reviewed and the verdict published.
    Reviewed {
        verdict: Verdict,
        comment: CommentAction,
        label: LabelAction,
    },
    /// The diff exceeded the size limit; the fallback message was posted.
    SkippedOversize {
        diff_chars: usize,
        comment: CommentAction,
        label: LabelAction,
    },
    /// The marked comment and label were cleared.
    Cleared {
        comment: CommentAction,
        label: LabelAction,
    },
}
