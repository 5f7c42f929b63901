//! Relational store access: batch fetch and classification insert.
//!
//! One `PgConnection`, no pool. The connection is acquired once per run
//! by [`PgIncidentStore::connect`] and released exactly once by
//! [`IncidentStore::close`], whichever way the batch loop exits.

use sqlx::{Connection, PgConnection};
use tracing::debug;

use crate::classify::Priority;
use crate::errors::StoreError;

/// Fixed byte budget of the stored response column.
pub const RESPONSE_BYTE_BUDGET: usize = 200;

const FETCH_PENDING_SQL: &str = "\
    SELECT event_id, event_subject, event_desc \
    FROM event \
    WHERE state_id = $1 AND sys_agenda_id = $2 AND event_template = $3 \
      AND NOT EXISTS (SELECT 1 FROM event_ai WHERE event_ai.event_id = event.event_id) \
    LIMIT $4";

const INSERT_CLASSIFICATION_SQL: &str =
    "INSERT INTO event_ai (event_id, response, priority) VALUES ($1, $2, $3)";

/// One pending incident, immutable once fetched.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingIncident {
    pub event_id: i64,
    #[sqlx(rename = "event_subject")]
    pub subject: String,
    #[sqlx(rename = "event_desc")]
    pub description: Option<String>,
}

/// Fetch-side filters for one batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchFilters {
    pub state_id: i64,
    pub agenda_id: i64,
    pub template_id: i64,
    pub limit: i64,
}

/// Storage seam the orchestrator is generic over.
///
/// Production impl is [`PgIncidentStore`]; tests use in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait IncidentStore {
    /// Up to `filters.limit` incidents awaiting classification, arbitrary
    /// order.
    async fn fetch_pending(
        &mut self,
        filters: &BatchFilters,
    ) -> Result<Vec<PendingIncident>, StoreError>;

    /// One auto-committed insert into the classification table.
    async fn insert_classification(
        &mut self,
        event_id: i64,
        response: &str,
        priority: Priority,
    ) -> Result<(), StoreError>;

    /// Releases the connection. Consumes the store so a run cannot touch
    /// the database after release.
    async fn close(self) -> Result<(), StoreError>;
}

/// Postgres-backed store over a single connection.
#[derive(Debug)]
pub struct PgIncidentStore {
    conn: PgConnection,
}

impl PgIncidentStore {
    /// Opens the single connection for this run.
    ///
    /// # Errors
    /// Returns [`StoreError::Connect`] when the connection cannot be
    /// established.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        debug!("connecting to database");
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(StoreError::Connect)?;
        debug!("database connection established");
        Ok(Self { conn })
    }
}

impl IncidentStore for PgIncidentStore {
    async fn fetch_pending(
        &mut self,
        filters: &BatchFilters,
    ) -> Result<Vec<PendingIncident>, StoreError> {
        sqlx::query_as::<_, PendingIncident>(FETCH_PENDING_SQL)
            .bind(filters.state_id)
            .bind(filters.agenda_id)
            .bind(filters.template_id)
            .bind(filters.limit)
            .fetch_all(&mut self.conn)
            .await
            .map_err(StoreError::Query)
    }

    async fn insert_classification(
        &mut self,
        event_id: i64,
        response: &str,
        priority: Priority,
    ) -> Result<(), StoreError> {
        debug!(event_id, priority = priority.code(), "inserting classification");
        sqlx::query(INSERT_CLASSIFICATION_SQL)
            .bind(event_id)
            .bind(response)
            .bind(priority.code())
            .execute(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Insert { event_id, source: e })
    }

    async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await.map_err(StoreError::Close)
    }
}
