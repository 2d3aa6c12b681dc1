//! Pull request review flow for tollgate.
//!
//! Provides the GitHub client with its retry policy, the LLM reviewer,
//! prompt and comment templates, sentinel parsing, and the [`annotator`]
//! that ties them together.

pub mod annotator;
pub mod comment;
pub mod github;
pub mod llm;
pub mod prompt;
pub mod verdict;
