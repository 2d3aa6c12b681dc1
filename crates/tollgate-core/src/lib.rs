//! Core types, configuration, and error handling for tollgate.
//!
//! This crate provides the shared foundation used by the review crate and
//! the binary:
//! - [`TollgateError`] — unified error type using `thiserror` and `miette`
//! - [`Config`] — run configuration resolved from the CI environment, with
//!   tunables from [`Settings`] (`.tollgate.toml`)
//! - Shared types: [`PullRequestRef`], [`Verdict`], [`CommentAction`],
//!   [`LabelAction`], [`Outcome`]

mod config;
mod error;
mod types;

pub use config::{
    Config, GitHubConfig, LlmConfig, Provider, ReviewConfig, Settings, ENV_GITHUB_TOKEN,
    ENV_LLM_API_KEY, ENV_MODEL, ENV_OWNER, ENV_PULL_REQUEST, ENV_REPO, REQUIRED_ENV,
};
pub use error::TollgateError;
pub use types::{CommentAction, LabelAction, Outcome, PullRequestRef, Verdict};

/// A convenience `Result` type for tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
