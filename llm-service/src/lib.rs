//! Thin client for the Anthropic Messages API.
//!
//! One provider, one profile: the crate exposes a validated env-driven
//! configuration ([`AnthropicConfig`]), a non-streaming client
//! ([`AnthropicService`]) and a unified error type ([`LlmError`]).
//! Construct the service once at startup and share it by reference; it
//! keeps a preconfigured `reqwest::Client` with timeout and default
//! headers.
//!
//! The client deliberately consumes only the first generated text block
//! of a response. Callers that need richer metadata should extend
//! [`anthropic_service`] rather than re-parse raw payloads downstream.

pub mod anthropic_service;
pub mod config;
pub mod error_handler;

pub use anthropic_service::AnthropicService;
pub use config::AnthropicConfig;
pub use error_handler::{LlmError, Result};
