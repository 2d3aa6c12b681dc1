use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tollgate_core::{LlmConfig, Provider, TollgateError};
use tracing::{debug, info};

use crate::prompt;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Something that turns a diff into review text.
///
/// The returned text is expected to end with one of the sentinel lines in
/// [`crate::verdict`], but callers must not rely on it.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Review a unified diff and return the free-text review.
    async fn review_diff(&self, diff: &str) -> Result<String, TollgateError>;
}

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use tollgate_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Review this code");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input.
    User,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// LLM client speaking either the Anthropic Messages API or an
/// OpenAI-compatible chat completions API.
///
/// One request per call, no retries.
///
/// # Examples
///
/// ```
/// use tollgate_core::LlmConfig;
/// use tollgate_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     model: "claude-sonnet-4-5".into(),
///     api_key: "test-key".into(),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.model(), "claude-sonnet-4-5");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, TollgateError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TollgateError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send the messages and return the first text segment of the reply.
    ///
    /// # Errors
    ///
    /// Returns [`TollgateError::Llm`] on HTTP errors or response parsing failures.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, TollgateError> {
        match self.config.provider {
            Provider::Anthropic => self.anthropic(messages).await,
            Provider::OpenAi => self.openai(messages).await,
        }
    }

    async fn anthropic(&self, messages: Vec<ChatMessage>) -> Result<String, TollgateError> {
        let url = format!("{}/v1/messages", self.config.resolved_base_url());
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": messages,
        });
        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response_body = send(request).await?;
        let parsed: MessagesResponse = serde_json::from_value(response_body.clone())
            .map_err(|e| TollgateError::Llm(format!("unexpected response structure: {e}")))?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| {
                TollgateError::Llm(format!("response contained no text: {response_body}"))
            })
    }

    async fn openai(&self, messages: Vec<ChatMessage>) -> Result<String, TollgateError> {
        let url = format!("{}/v1/chat/completions", self.config.resolved_base_url());
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": messages,
        });
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body);

        let response_body = send(request).await?;
        response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                TollgateError::Llm(format!("unexpected response structure: {response_body}"))
            })
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<serde_json::Value, TollgateError> {
    let response = request
        .send()
        .await
        .map_err(|e| TollgateError::Llm(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(TollgateError::Llm(format!(
            "LLM API error {status}: {body_text}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| TollgateError::Llm(format!("failed to parse response: {e}")))
}

#[async_trait]
impl Reviewer for LlmClient {
    async fn review_diff(&self, diff: &str) -> Result<String, TollgateError> {
        let messages = vec![ChatMessage::user(prompt::build_review_prompt(diff))];
        debug!(provider = %self.config.provider, model = self.model(), "requesting review");
        let review = self.chat(messages).await?;
        info!(chars = review.chars().count(), "received review");
        Ok(review)
    }
}
