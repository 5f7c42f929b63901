//! Runtime configuration for one triage run.
//!
//! An explicit struct built once at startup from environment variables and
//! passed by reference; nothing in the crate reads process env after this.

use std::path::PathBuf;

use crate::errors::ConfigError;
use crate::store::BatchFilters;

/// Default workflow state for pending incidents.
pub const DEFAULT_STATE_ID: i64 = 96_719;

/// Default agenda the batch is scoped to.
pub const DEFAULT_AGENDA_ID: i64 = 3_907_041;

/// Default event template filter.
pub const DEFAULT_TEMPLATE_ID: i64 = 0;

/// Default number of incidents fetched per run.
pub const DEFAULT_BATCH_SIZE: i64 = 5;

/// Default directory for per-run side logs.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Validated configuration for [`crate::run_triage`].
///
/// Environment variables:
/// - `DATABASE_URL` (required)
/// - `TRIAGE_STATE_ID` (default [`DEFAULT_STATE_ID`])
/// - `TRIAGE_AGENDA_ID` (default [`DEFAULT_AGENDA_ID`])
/// - `TRIAGE_TEMPLATE_ID` (default [`DEFAULT_TEMPLATE_ID`])
/// - `TRIAGE_BATCH_SIZE` (default [`DEFAULT_BATCH_SIZE`])
/// - `TRIAGE_LOG_DIR` (default [`DEFAULT_LOG_DIR`])
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Workflow state pending incidents must be in.
    pub state_id: i64,
    /// Agenda the batch is scoped to.
    pub agenda_id: i64,
    /// Event template filter.
    pub template_id: i64,
    /// Upper bound on rows fetched per run.
    pub batch_size: i64,
    /// Directory the per-run side logs are written under.
    pub log_dir: PathBuf,
}

impl TriageConfig {
    /// Builds a configuration from process environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingVar`] when `DATABASE_URL` is absent and
    /// [`ConfigError::InvalidNumber`] when a numeric override fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = must_env("DATABASE_URL")?;
        let state_id = env_or_i64("TRIAGE_STATE_ID", DEFAULT_STATE_ID)?;
        let agenda_id = env_or_i64("TRIAGE_AGENDA_ID", DEFAULT_AGENDA_ID)?;
        let template_id = env_or_i64("TRIAGE_TEMPLATE_ID", DEFAULT_TEMPLATE_ID)?;
        let batch_size = env_or_i64("TRIAGE_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let log_dir = PathBuf::from(env_or("TRIAGE_LOG_DIR", DEFAULT_LOG_DIR));

        Ok(Self {
            database_url,
            state_id,
            agenda_id,
            template_id,
            batch_size,
            log_dir,
        })
    }

    /// Fetch-side filters derived from this configuration.
    pub fn filters(&self) -> BatchFilters {
        BatchFilters {
            state_id: self.state_id,
            agenda_id: self.agenda_id,
            template_id: self.template_id,
            limit: self.batch_size,
        }
    }
}

fn must_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_or_i64(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    expected: "i64",
                })
        }
        _ => Ok(default),
    }
}
