use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tollgate_core::{CommentAction, GitHubConfig, PullRequestRef, TollgateError};
use tracing::{debug, error, info, instrument, warn};

/// Media type for regular JSON responses.
pub const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
/// Media type that makes the pulls endpoint return a unified diff.
pub const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

const USER_AGENT: &str = concat!("tollgate/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: usize = 100;

/// An issue comment as returned by the GitHub REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    /// Comment id.
    pub id: u64,
    /// Markdown body.
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

/// GitHub REST client for the handful of calls a review run makes.
///
/// Every call goes through [`GitHubClient::request`], which retries server
/// errors and transport failures with exponential backoff and fails fast on
/// client errors.
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    config: GitHubConfig,
}

impl GitHubClient {
    /// Create a client from the resolved GitHub configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Config`] if the API base is not a usable URL
    /// or the token is not a valid header value, and [`TollgateError::GitHub`]
    /// if the HTTP client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, TollgateError> {
        let base = Url::parse(&config.api_base).map_err(|e| {
            TollgateError::Config(format!("invalid GitHub API base '{}': {e}", config.api_base))
        })?;
        if base.cannot_be_a_base() {
            return Err(TollgateError::Config(format!(
                "invalid GitHub API base '{}'",
                config.api_base
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| TollgateError::Config("GITHUB_TOKEN is not a valid header value".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| TollgateError::GitHub(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            config: config.clone(),
        })
    }

    /// Send a request, retrying transient failures.
    ///
    /// - a status in `expected` returns the response;
    /// - a 4xx status returns [`TollgateError::Client`] without retrying;
    /// - a 5xx status or a transport error is retried up to
    ///   `config.retries` attempts in total, sleeping `backoff(attempt)`
    ///   between attempts;
    /// - any other status returns [`TollgateError::UnexpectedStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::RetriesExhausted`] when no attempt succeeds.
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        accept: &str,
        body: Option<&serde_json::Value>,
        expected: &[StatusCode],
    ) -> Result<Response, TollgateError> {
        let attempts = self.config.retries;
        for attempt in 0..attempts {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header(header::ACCEPT, accept);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if expected.contains(&status) {
                        debug!(%method, %url, %status, "GitHub request succeeded");
                        return Ok(response);
                    }
                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        error!(%method, %url, %status, "GitHub API returned client error");
                        return Err(TollgateError::Client {
                            method: method.to_string(),
                            url: url.to_string(),
                            status: status.as_u16(),
                            body,
                        });
                    }
                    if !status.is_server_error() {
                        return Err(TollgateError::UnexpectedStatus {
                            method: method.to_string(),
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    warn!(
                        %method, %url, %status,
                        "GitHub API server error (attempt {}/{attempts})",
                        attempt + 1
                    );
                }
                Err(e) => {
                    warn!(
                        %method, %url, error = %e,
                        "GitHub request failed (attempt {}/{attempts})",
                        attempt + 1
                    );
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.config.backoff(attempt)).await;
            }
        }

        error!(%method, %url, "GitHub request failed after {attempts} attempts");
        Err(TollgateError::RetriesExhausted {
            method: method.to_string(),
            url: url.to_string(),
            attempts,
        })
    }

    /// Fetch the unified diff of a pull request.
    ///
    /// # Errors
    ///
    /// Propagates [`GitHubClient::request`] failures, or
    /// [`TollgateError::GitHub`] if the body cannot be read.
    #[instrument(skip(self), fields(pr = %pr))]
    pub async fn fetch_diff(&self, pr: &PullRequestRef) -> Result<String, TollgateError> {
        let number = pr.number.to_string();
        let url = self.url(&[
            "repos",
            pr.owner.as_str(),
            pr.repo.as_str(),
            "pulls",
            number.as_str(),
        ])?;
        let response = self
            .request(Method::GET, url, DIFF_MEDIA_TYPE, None, &[StatusCode::OK])
            .await?;
        let diff = response
            .text()
            .await
            .map_err(|e| TollgateError::GitHub(format!("failed to read diff response: {e}")))?;
        debug!(chars = diff.chars().count(), "fetched diff");
        Ok(diff)
    }

    /// List every issue comment on the pull request, following pagination.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding failures.
    pub async fn list_comments(
        &self,
        pr: &PullRequestRef,
    ) -> Result<Vec<IssueComment>, TollgateError> {
        let mut comments = Vec::new();
        for page in 1.. {
            let mut url = self.issue_url(pr, &["comments"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<IssueComment> = self.get_json(url).await?;
            let done = batch.len() < PAGE_SIZE;
            comments.extend(batch);
            if done {
                break;
            }
        }
        Ok(comments)
    }

    /// Id of the first comment whose body contains `marker`, if any.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding failures.
    #[instrument(skip(self), fields(pr = %pr))]
    pub async fn find_marked_comment(
        &self,
        pr: &PullRequestRef,
        marker: &str,
    ) -> Result<Option<u64>, TollgateError> {
        let comments = self.list_comments(pr).await?;
        let found = comments
            .into_iter()
            .find(|c| c.body.contains(marker))
            .map(|c| c.id);
        debug!(?found, "searched for marked comment");
        Ok(found)
    }

    /// Update the marked comment in place, or create it if none exists.
    ///
    /// Issues exactly one mutating request.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding failures.
    #[instrument(skip(self, body), fields(pr = %pr))]
    pub async fn upsert_comment(
        &self,
        pr: &PullRequestRef,
        marker: &str,
        body: &str,
    ) -> Result<CommentAction, TollgateError> {
        let payload = serde_json::json!({ "body": body });
        match self.find_marked_comment(pr, marker).await? {
            Some(id) => {
                let url = self.comment_url(pr, id)?;
                self.request(
                    Method::PATCH,
                    url,
                    JSON_MEDIA_TYPE,
                    Some(&payload),
                    &[StatusCode::OK],
                )
                .await?;
                info!(id, "updated existing review comment");
                Ok(CommentAction::Updated(id))
            }
            None => {
                let url = self.issue_url(pr, &["comments"])?;
                let response = self
                    .request(
                        Method::POST,
                        url,
                        JSON_MEDIA_TYPE,
                        Some(&payload),
                        &[StatusCode::CREATED],
                    )
                    .await?;
                let created: IssueComment = decode(response).await?;
                info!(id = created.id, "posted review comment");
                Ok(CommentAction::Created(created.id))
            }
        }
    }

    /// Delete an issue comment by id.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    #[instrument(skip(self), fields(pr = %pr))]
    pub async fn delete_comment(&self, pr: &PullRequestRef, id: u64) -> Result<(), TollgateError> {
        let url = self.comment_url(pr, id)?;
        self.request(
            Method::DELETE,
            url,
            JSON_MEDIA_TYPE,
            None,
            &[StatusCode::NO_CONTENT, StatusCode::OK],
        )
        .await?;
        info!(id, "deleted review comment");
        Ok(())
    }

    /// Names of the labels currently on the pull request.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding failures.
    #[instrument(skip(self), fields(pr = %pr))]
    pub async fn list_labels(&self, pr: &PullRequestRef) -> Result<Vec<String>, TollgateError> {
        let mut url = self.issue_url(pr, &["labels"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &PAGE_SIZE.to_string());
        let labels: Vec<Label> = self.get_json(url).await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    /// Attach a label to the pull request.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    #[instrument(skip(self), fields(pr = %pr))]
    pub async fn add_label(&self, pr: &PullRequestRef, name: &str) -> Result<(), TollgateError> {
        let url = self.issue_url(pr, &["labels"])?;
        let payload = serde_json::json!({ "labels": [name] });
        self.request(
            Method::POST,
            url,
            JSON_MEDIA_TYPE,
            Some(&payload),
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;
        info!(label = name, "added label");
        Ok(())
    }

    /// Detach a label from the pull request.
    ///
    /// # Errors
    ///
    /// Propagates request failures, including a 404 if the label is not set.
    #[instrument(skip(self), fields(pr = %pr))]
    pub async fn remove_label(&self, pr: &PullRequestRef, name: &str) -> Result<(), TollgateError> {
        let url = self.issue_url(pr, &["labels", name])?;
        self.request(
            Method::DELETE,
            url,
            JSON_MEDIA_TYPE,
            None,
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await?;
        info!(label = name, "removed label");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TollgateError> {
        let response = self
            .request(Method::GET, url, JSON_MEDIA_TYPE, None, &[StatusCode::OK])
            .await?;
        decode(response).await
    }

    fn issue_url(&self, pr: &PullRequestRef, rest: &[&str]) -> Result<Url, TollgateError> {
        let number = pr.number.to_string();
        let mut segments = vec![
            "repos",
            pr.owner.as_str(),
            pr.repo.as_str(),
            "issues",
            number.as_str(),
        ];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn comment_url(&self, pr: &PullRequestRef, id: u64) -> Result<Url, TollgateError> {
        let id = id.to_string();
        self.url(&[
            "repos",
            pr.owner.as_str(),
            pr.repo.as_str(),
            "issues",
            "comments",
            id.as_str(),
        ])
    }

    /// Join percent-encoded path segments onto the API base.
    fn url(&self, segments: &[&str]) -> Result<Url, TollgateError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TollgateError::Config(format!("invalid GitHub API base '{}'", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TollgateError> {
    response
        .json()
        .await
        .map_err(|e| TollgateError::GitHub(format!("failed to decode GitHub response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str) -> GitHubClient {
        let config = GitHubConfig {
            token: "ghp_test".into(),
            api_base: api_base.into(),
            ..GitHubConfig::default()
        };
        GitHubClient::new(&config).unwrap()
    }

    fn pr() -> PullRequestRef {
        PullRequestRef {
            owner: "acme".into(),
            repo: "widgets".into(),
            number: 42,
        }
    }

    #[test]
    fn builds_issue_urls() {
        let gh = client("https://api.github.com");
        let url = gh.issue_url(&pr(), &["comments"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widgets/issues/42/comments"
        );
    }

    #[test]
    fn keeps_enterprise_base_path() {
        let gh = client("https://ghe.example.com/api/v3/");
        let url = gh.comment_url(&pr(), 7).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/widgets/issues/comments/7"
        );
    }

    #[test]
    fn encodes_label_names() {
        let gh = client("https://api.github.com");
        let url = gh.issue_url(&pr(), &["labels", "needs review/ai"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widgets/issues/42/labels/needs%20review%2Fai"
        );
    }

    #[test]
    fn rejects_unusable_api_base() {
        let config = GitHubConfig {
            token: "t".into(),
            api_base: "not a url".into(),
            ..GitHubConfig::default()
        };
        assert!(matches!(
            GitHubClient::new(&config),
            Err(TollgateError::Config(_))
        ));
    }

    #[test]
    fn rejects_token_with_newline() {
        let config = GitHubConfig {
            token: "bad\ntoken".into(),
            ..GitHubConfig::default()
        };
        assert!(matches!(
            GitHubClient::new(&config),
            Err(TollgateError::Config(_))
        ));
    }
}
