//! Environment-driven configuration for the Anthropic client.
//!
//! A single profile covers the whole crate. Values come from process
//! environment variables, with sensible defaults for everything except
//! the API key.

use crate::error_handler::{env_opt_u32, env_opt_u64, env_or, must_env, Result};

/// Default model when `ANTHROPIC_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Default API root when `ANTHROPIC_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default generation budget when `LLM_MAX_TOKENS` is unset.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Validated configuration for [`crate::AnthropicService`].
///
/// Environment variables:
/// - `ANTHROPIC_API_KEY` (required, non-empty)
/// - `ANTHROPIC_MODEL` (default [`DEFAULT_MODEL`])
/// - `ANTHROPIC_BASE_URL` (default [`DEFAULT_BASE_URL`])
/// - `LLM_MAX_TOKENS` (default [`DEFAULT_MAX_TOKENS`])
/// - `LLM_TIMEOUT_SECS` (optional, client falls back to its own default)
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Model identifier sent in every request body.
    pub model: String,
    /// API root, without the `/v1/messages` suffix.
    pub endpoint: String,
    /// Secret key, sent via the `x-api-key` header.
    pub api_key: String,
    /// Upper bound on generated tokens per request.
    pub max_tokens: u32,
    /// Whole-request timeout override in seconds.
    pub timeout_secs: Option<u64>,
}

impl AnthropicConfig {
    /// Builds a configuration from process environment variables.
    ///
    /// # Errors
    /// Returns [`crate::LlmError::MissingVar`] when the API key is absent
    /// and [`crate::LlmError::InvalidNumber`] when a numeric override
    /// fails to parse.
    pub fn from_env() -> Result<Self> {
        let api_key = must_env("ANTHROPIC_API_KEY")?;
        let model = env_or("ANTHROPIC_MODEL", DEFAULT_MODEL);
        let endpoint = env_or("ANTHROPIC_BASE_URL", DEFAULT_BASE_URL);
        let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout_secs = env_opt_u64("LLM_TIMEOUT_SECS")?;

        Ok(Self {
            model,
            endpoint,
            api_key,
            max_tokens,
            timeout_secs,
        })
    }
}
