//! Unified error handling for `llm-service`.
//!
//! A single top-level [`LlmError`] covers config validation, transport,
//! upstream HTTP status mapping, and response decoding. Small helpers for
//! reading environment variables return the unified [`Result<T>`] alias.
//!
//! All messages include the suffix `[LLM Service]` to simplify attribution
//! in logs.

use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Top-level error for the `llm-service` crate.
///
/// The orchestrating caller treats every variant as one opaque inference
/// failure; the variants exist so logs and tests can tell an auth problem
/// from a rate limit or a malformed reply.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// Required environment variable is missing or empty.
    #[error("[LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (token budgets, timeouts).
    #[error("[LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_MAX_TOKENS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// API key absent or empty at construction time.
    #[error("[LLM Service] missing API key")]
    MissingApiKey,

    /// Endpoint is empty or does not start with http/https.
    #[error("[LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Upstream rejected the credentials (HTTP 401/403).
    #[error("[LLM Service] unauthorized: check ANTHROPIC_API_KEY")]
    Unauthorized,

    /// Upstream rate limit (HTTP 429).
    #[error("[LLM Service] rate limited")]
    RateLimited {
        /// Parsed `retry-after` header, when the upstream sent one.
        retry_after_secs: Option<u64>,
    },

    /// Upstream server failure (HTTP 5xx).
    #[error("[LLM Service] server error: status {0}")]
    Server(u16),

    /// Any other non-success HTTP status.
    #[error("[LLM Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Request exceeded the configured client timeout.
    #[error("[LLM Service] request timed out")]
    Timeout,

    /// Network/transport failure without an HTTP status.
    #[error("[LLM Service] transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Response payload could not be decoded as expected.
    #[error("[LLM Service] failed to decode response: {0}")]
    Decode(String),

    /// Response decoded fine but carried no text content block.
    #[error("[LLM Service] response contained no text content")]
    EmptyContent,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Transport(e)
        }
    }
}

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`LlmError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LlmError::MissingVar(name)),
    }
}

/// Reads an optional variable, falling back to `default` when unset/empty.
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`LlmError::InvalidNumber`] if the variable is set but not a
/// valid `u32`.
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u32>()
                .map(Some)
                .map_err(|_| LlmError::InvalidNumber {
                    var: name,
                    reason: "expected u32",
                })
        }
        _ => Ok(None),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`LlmError::InvalidNumber`] if the variable is set but not a
/// valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u64>()
                .map(Some)
                .map_err(|_| LlmError::InvalidNumber {
                    var: name,
                    reason: "expected u64",
                })
        }
        _ => Ok(None),
    }
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`LlmError::InvalidEndpoint`] otherwise.
pub fn validate_http_endpoint(value: &str) -> Result<()> {
    let v = value.trim();
    if v.is_empty() || !(v.starts_with("http://") || v.starts_with("https://")) {
        return Err(LlmError::InvalidEndpoint(value.to_string()));
    }
    Ok(())
}
