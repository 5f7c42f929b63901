//! Crate-wide error hierarchy for incident-triage.
//!
//! Goals:
//! - Single root [`Error`] for all public functions.
//! - Domain sub-enums (store, config) with `From` impls for `?` ergonomics.
//! - A typed per-row outcome ([`RowError`]) so the batch loop decides
//!   continue-vs-abort by inspecting the error kind, not the call site.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type TriageResult<T> = Result<T, Error>;

/// Root error type for the incident-triage crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Relational store failure (connect, query, insert, close).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration problems (missing/invalid env values).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Inference service failure, surfaced as one opaque kind.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Relational store errors.
///
/// `Connect` and `Query` are fatal to the run; `Insert` is recovered per
/// row by the batch loop; `Close` is logged and never propagated.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connect failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("batch fetch failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("insert failed for event {event_id}: {source}")]
    Insert {
        event_id: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("connection close failed: {0}")]
    Close(#[source] sqlx::Error),
}

/// Configuration and startup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid number in {var}: expected {expected}")]
    InvalidNumber {
        var: &'static str,
        expected: &'static str,
    },
}

/// Outcome of one per-row pipeline pass.
///
/// The batch loop inspects the variant: [`RowError::Fatal`] aborts the
/// remaining rows (the connection is still released), while
/// [`RowError::Recoverable`] is logged, the row is skipped, and the loop
/// advances.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Fatal(Error),

    #[error("row skipped: {0}")]
    Recoverable(Error),
}
