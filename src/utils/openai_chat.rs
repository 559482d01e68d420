use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use super::prompts::SYSTEM_PROMPT;

// Same as the default of the official OpenAI client libraries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Error, Debug)]
pub enum ChatCompletionError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("response contained no message content")]
    EmptyResponse,
}

/// One chat completion exchange: a system message, a user message and sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
}

impl ChatRequest {
    /// Request with the fixed assistant system message and temperature 0.0.
    pub fn new(user: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user: user.into(),
            model: model.into(),
            temperature: 0.0,
        }
    }
}

#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Sends one request and returns the trimmed text of the first choice.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatCompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatRequest> for ChatCompletionBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionService {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl ChatCompletionService {
    pub fn new(api_key: String, api_base: &str) -> Result<Self, ChatCompletionError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatCompleter for ChatCompletionService {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatCompletionError> {
        let body = ChatCompletionBody::from(request);

        debug!(
            "Sending chat completion request to {} (model: {}, prompt: {} characters)",
            self.endpoint,
            request.model,
            request.user.chars().count()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Chat completion API error: Status {}", status);
            return Err(api_error(status, &response_text));
        }

        debug!(
            "Received chat completion response: {} bytes",
            response_text.len()
        );
        parse_completion(&response_text)
    }
}

/// Extracts the trimmed content of the first choice from a success body.
fn parse_completion(body: &str) -> Result<String, ChatCompletionError> {
    let parsed = serde_json::from_str::<ChatCompletionResponse>(body)?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or(ChatCompletionError::EmptyResponse)
}

/// Maps a non-success status and body to an error, preferring the API's own message.
fn api_error(status: StatusCode, body: &str) -> ChatCompletionError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ChatCompletionError::Authentication(message)
        }
        StatusCode::TOO_MANY_REQUESTS => ChatCompletionError::RateLimited(message),
        _ => ChatCompletionError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
