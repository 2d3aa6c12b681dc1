use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TollgateError;
use crate::types::PullRequestRef;

/// Model identifier for the reviewer.
pub const ENV_MODEL: &str = "CLAUDE_MODEL";
/// Token for the GitHub REST API.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// API key for the LLM provider.
pub const ENV_LLM_API_KEY: &str = "ANTHROPIC_API_KEY";
/// Pull request URL; its last path segment is the PR number.
pub const ENV_PULL_REQUEST: &str = "CIRCLE_PULL_REQUEST";
/// Repository owner.
pub const ENV_OWNER: &str = "CIRCLE_PROJECT_USERNAME";
/// Repository name.
pub const ENV_REPO: &str = "CIRCLE_PROJECT_REPONAME";

/// Every environment variable a run needs, in the order they are reported.
pub const REQUIRED_ENV: [&str; 6] = [
    ENV_MODEL,
    ENV_GITHUB_TOKEN,
    ENV_LLM_API_KEY,
    ENV_PULL_REQUEST,
    ENV_OWNER,
    ENV_REPO,
];

/// Tunables loaded from `.tollgate.toml`.
///
/// Secrets and the pull request identity never come from this file; they are
/// filled in from the environment by [`Config::resolve`].
///
/// # Examples
///
/// ```
/// use tollgate_core::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.review.max_diff_chars, 15000);
/// assert_eq!(settings.github.retries, 3);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl Settings {
    /// Load settings from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Io`] if the file cannot be read, or
    /// [`TollgateError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, TollgateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_core::Settings;
    ///
    /// let settings = Settings::from_toml("[review]\nlabel = \"needs-human\"\n").unwrap();
    /// assert_eq!(settings.review.label, "needs-human");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TollgateError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }
}

/// GitHub REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Bearer token, from `GITHUB_TOKEN`.
    #[serde(skip)]
    pub token: String,
    /// API base URL (default: `https://api.github.com`).
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request, including the first (default: 3).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay before the second attempt; doubles after every failure (default: 1000).
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

impl GitHubConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay to wait after the zero-indexed failed `attempt`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tollgate_core::GitHubConfig;
    ///
    /// let config = GitHubConfig::default();
    /// assert_eq!(config.backoff(0), Duration::from_secs(1));
    /// assert_eq!(config.backoff(2), Duration::from_secs(4));
    /// ```
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// LLM API flavour spoken by the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Messages API.
    #[default]
    Anthropic,
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint.
    OpenAi,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider API flavour.
    #[serde(default)]
    pub provider: Provider,
    /// Model identifier, from `CLAUDE_MODEL`.
    #[serde(skip)]
    pub model: String,
    /// API key, from `ANTHROPIC_API_KEY`.
    #[serde(skip)]
    pub api_key: String,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Upper bound on response tokens (default: 4000).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    4000
}

impl LlmConfig {
    /// Base URL for the configured provider, without a trailing slash.
    pub fn resolved_base_url(&self) -> &str {
        let url = match (&self.base_url, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, Provider::Anthropic) => "https://api.anthropic.com",
            (None, Provider::OpenAi) => "https://api.openai.com",
        };
        url.trim_end_matches('/')
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: String::new(),
            api_key: String::new(),
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Review behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Diffs longer than this many characters skip the LLM (default: 15000).
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,
    /// Label attached while the latest review is blocking.
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_max_diff_chars() -> usize {
    15000
}

fn default_label() -> String {
    "ai-review-required".into()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_diff_chars: default_max_diff_chars(),
            label: default_label(),
        }
    }
}

/// Fully resolved configuration for one run.
///
/// Built once at start-up and passed by reference to every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// The pull request under review.
    pub pr: PullRequestRef,
    /// GitHub API settings, including the token.
    pub github: GitHubConfig,
    /// LLM settings, including model and API key.
    pub llm: LlmConfig,
    /// Review behavior settings.
    pub review: ReviewConfig,
}

impl Config {
    /// Whether the environment describes a pull request build at all.
    ///
    /// Only the presence of the variable is checked; an empty value still
    /// counts and is rejected later by [`Config::resolve`].
    pub fn pr_requested(lookup: impl Fn(&str) -> Option<String>) -> bool {
        lookup(ENV_PULL_REQUEST).is_some()
    }

    /// Resolve the run configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve`].
    pub fn from_env(settings: Settings) -> Result<Self, TollgateError> {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    /// Resolve the run configuration from `settings` and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Config`] naming every missing or empty
    /// required variable, if the PR number cannot be parsed, or if the
    /// settings are out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_core::{Config, Settings};
    ///
    /// let env = |key: &str| match key {
    ///     "CLAUDE_MODEL" => Some("claude-sonnet-4-5".to_string()),
    ///     "GITHUB_TOKEN" => Some("ghp_x".to_string()),
    ///     "ANTHROPIC_API_KEY" => Some("sk-x".to_string()),
    ///     "CIRCLE_PULL_REQUEST" => Some("https://github.com/acme/app/pull/9".to_string()),
    ///     "CIRCLE_PROJECT_USERNAME" => Some("acme".to_string()),
    ///     "CIRCLE_PROJECT_REPONAME" => Some("app".to_string()),
    ///     _ => None,
    /// };
    /// let config = Config::resolve(Settings::default(), env).unwrap();
    /// assert_eq!(config.pr.number, 9);
    /// ```
    pub fn resolve(
        settings: Settings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TollgateError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_ENV
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(TollgateError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let required = |key: &str| get(key).unwrap_or_default();

        if settings.github.retries == 0 {
            return Err(TollgateError::Config(
                "github.retries must be at least 1".into(),
            ));
        }

        let pr = PullRequestRef::from_url(
            &required(ENV_OWNER),
            &required(ENV_REPO),
            &required(ENV_PULL_REQUEST),
        )?;

        let Settings {
            mut github,
            mut llm,
            review,
        } = settings;
        github.token = required(ENV_GITHUB_TOKEN);
        llm.model = required(ENV_MODEL);
        llm.api_key = required(ENV_LLM_API_KEY);

        Ok(Self {
            pr,
            github,
            llm,
            review,
        })
    }
}
