//! Non-streaming client for the Anthropic Messages API.
//!
//! The service owns a preconfigured `reqwest::Client` with default
//! headers and a whole-request timeout. [`AnthropicService::generate`]
//! sends one user message and returns the first text content block of
//! the reply.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::AnthropicConfig;
use crate::error_handler::{validate_http_endpoint, LlmError, Result};

/// Pinned Messages API revision sent with every request.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Whole-request timeout when `LLM_TIMEOUT_SECS` is unset.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Max bytes of an error body quoted into [`LlmError::HttpStatus`].
const SNIPPET_LIMIT: usize = 240;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Thin client over `POST {base}/v1/messages`.
///
/// Construct once at startup and share by reference; the inner
/// `reqwest::Client` pools connections internally.
#[derive(Debug)]
pub struct AnthropicService {
    client: reqwest::Client,
    cfg: AnthropicConfig,
    url_messages: String,
}

impl AnthropicService {
    /// Validates the configuration and builds the HTTP client.
    ///
    /// # Errors
    /// Returns [`LlmError::MissingApiKey`] for an empty key,
    /// [`LlmError::InvalidEndpoint`] for a malformed base URL, and
    /// [`LlmError::Transport`] if the client cannot be constructed.
    pub fn new(cfg: AnthropicConfig) -> Result<Self> {
        if cfg.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        validate_http_endpoint(&cfg.endpoint)?;

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(cfg.api_key.trim())
            .map_err(|_| LlmError::MissingApiKey)?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let url_messages = format!("{}/v1/messages", cfg.endpoint.trim_end_matches('/'));

        info!(
            model = %cfg.model,
            endpoint = %url_messages,
            timeout_secs = timeout.as_secs(),
            "anthropic service ready"
        );

        Ok(Self {
            client,
            cfg,
            url_messages,
        })
    }

    /// Model identifier this service sends with every request.
    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Sends one user message and returns the first text block of the
    /// reply.
    ///
    /// # Errors
    /// Maps upstream HTTP failures onto [`LlmError`] variants; see the
    /// error type for the full taxonomy.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.cfg.model,
            max_tokens: self.cfg.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(prompt_chars = prompt.chars().count(), "sending messages request");

        let response = self
            .client
            .post(&self.url_messages)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status, &self.url_messages, retry_after, &text));
        }

        let decoded: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        first_text(decoded).ok_or(LlmError::EmptyContent)
    }
}

/// Pulls the first `text` content block out of a decoded response.
fn first_text(response: MessagesResponse) -> Option<String> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .filter(|text| !text.is_empty())
}

/// Maps a non-success status onto the error taxonomy.
fn map_status(
    status: StatusCode,
    url: &str,
    retry_after_secs: Option<u64>,
    body: &str,
) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after_secs },
        s if s.is_server_error() => LlmError::Server(s.as_u16()),
        s => LlmError::HttpStatus {
            status: s.as_u16(),
            url: url.to_string(),
            snippet: snippet(body),
        },
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Trims an error body to a loggable, char-safe prefix.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= SNIPPET_LIMIT {
        return trimmed.to_string();
    }
    let mut end = SNIPPET_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
