//! Public entry for the incident-triage pipeline.
//!
//! Single high-level function to run one batch pass over pending
//! incidents:
//!
//! 1) **Step 1 — Connect**: open the single database connection for this
//!    run and prepare the per-run side logs.
//! 2) **Step 2 — Fetch**: select up to `batch_size` incidents awaiting
//!    classification; an empty batch is a clean no-op.
//! 3) **Step 3 — Per-row pipeline**: classify via the inference seam,
//!    derive a priority from the raw reply (with fallback), truncate the
//!    raw reply to the storage byte budget, persist. A classification
//!    failure aborts the remaining rows; a persistence failure skips the
//!    row and the loop continues.
//! 4) **Step 4 — Release**: close the connection on every exit path and
//!    return a [`TriageSummary`].
//!
//! The pipeline uses `tracing` for step-level debug logging and avoids
//! `async-trait` and heap trait objects (no `Box<dyn ...>`). Collaborators
//! sit behind plain async-fn traits with static dispatch.

pub mod classify;
pub mod config;
pub mod errors;
pub mod extract;
pub mod runlog;
pub mod store;
pub mod textfit;

use std::time::Instant;

use tracing::{debug, info, warn};

use classify::{classify, derive_priority};
use textfit::truncate_to_bytes;

pub use classify::{Priority, PriorityModel};
pub use config::TriageConfig;
pub use errors::{ConfigError, Error, RowError, StoreError, TriageResult};
pub use runlog::RunLogs;
pub use store::{IncidentStore, PendingIncident, PgIncidentStore, RESPONSE_BYTE_BUDGET};

/// Structured outcome of one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TriageSummary {
    /// Rows returned by the fetch.
    pub fetched: usize,
    /// Rows whose classification call succeeded.
    pub classified: usize,
    /// Rows persisted to the classification table.
    pub persisted: usize,
    /// Rows whose persistence failed and was recovered.
    pub skipped: usize,
}

/// Runs one batch pass against the production collaborators.
///
/// Opens the single Postgres connection, then delegates to
/// [`run_batch`]; the connection is released on every exit path.
///
/// # Errors
/// Propagates connect, fetch, and classification failures; persistence
/// failures are recovered per row and reported via
/// [`TriageSummary::skipped`].
pub async fn run_triage<M: PriorityModel>(
    cfg: &TriageConfig,
    model: &M,
) -> TriageResult<TriageSummary> {
    let logs = RunLogs::create(&cfg.log_dir);

    debug!("step1: connect to incident store");
    let store = match PgIncidentStore::connect(&cfg.database_url).await {
        Ok(s) => {
            logs.event("connection successful");
            s
        }
        Err(e) => {
            logs.event(&format!("connection failed: {e}"));
            return Err(e.into());
        }
    };

    run_batch(cfg, store, model, &logs).await
}

/// Drives one batch over an already-connected store.
///
/// Generic over the collaborator seams so tests can substitute in-memory
/// fakes. Whatever the batch outcome, the store is closed exactly once
/// before this function returns.
pub async fn run_batch<S: IncidentStore, M: PriorityModel>(
    cfg: &TriageConfig,
    mut store: S,
    model: &M,
    logs: &RunLogs,
) -> TriageResult<TriageSummary> {
    let outcome = process_batch(cfg, &mut store, model, logs).await;

    debug!("step4: release connection");
    match store.close().await {
        Ok(()) => logs.event("connection closed"),
        Err(e) => {
            warn!("connection close failed: {e}");
            logs.event(&format!("connection close failed: {e}"));
        }
    }

    outcome
}

async fn process_batch<S: IncidentStore, M: PriorityModel>(
    cfg: &TriageConfig,
    store: &mut S,
    model: &M,
    logs: &RunLogs,
) -> TriageResult<TriageSummary> {
    let t0 = Instant::now();

    debug!("step2: fetch pending incidents");
    let incidents = store
        .fetch_pending(&cfg.filters())
        .await
        .map_err(Error::Store)?;

    let mut summary = TriageSummary {
        fetched: incidents.len(),
        ..TriageSummary::default()
    };
    logs.event(&format!("fetched {} pending incidents", incidents.len()));

    if incidents.is_empty() {
        info!("no pending incidents, nothing to do");
        logs.event("no pending incidents");
        return Ok(summary);
    }

    logs.table(&incidents);

    debug!("step3: classify and persist {} incidents", incidents.len());
    for incident in &incidents {
        let t_row = Instant::now();
        match process_row(store, model, incident, logs).await {
            Ok(()) => {
                summary.classified += 1;
                summary.persisted += 1;
                debug!(
                    "step3: event {} done in {} ms",
                    incident.event_id,
                    t_row.elapsed().as_millis()
                );
            }
            Err(RowError::Recoverable(e)) => {
                summary.classified += 1;
                summary.skipped += 1;
                warn!("event {} skipped: {e}", incident.event_id);
                logs.event(&format!("event {} skipped: {e}", incident.event_id));
            }
            Err(RowError::Fatal(e)) => {
                logs.event(&format!("batch aborted at event {}: {e}", incident.event_id));
                return Err(e);
            }
        }
    }

    info!(
        fetched = summary.fetched,
        persisted = summary.persisted,
        skipped = summary.skipped,
        "batch done in {} ms",
        t0.elapsed().as_millis()
    );
    logs.event(&format!(
        "batch done: {} persisted, {} skipped",
        summary.persisted, summary.skipped
    ));

    Ok(summary)
}

async fn process_row<S: IncidentStore, M: PriorityModel>(
    store: &mut S,
    model: &M,
    incident: &PendingIncident,
    logs: &RunLogs,
) -> Result<(), RowError> {
    let raw = classify(model, &incident.subject, incident.description.as_deref())
        .await
        .map_err(RowError::Fatal)?;
    logs.event(&format!(
        "event {}: model replied ({} bytes)",
        incident.event_id,
        raw.len()
    ));

    let priority = derive_priority(&raw);
    let stored = truncate_to_bytes(&raw, RESPONSE_BYTE_BUDGET);

    store
        .insert_classification(incident.event_id, stored, priority)
        .await
        .map_err(|e| RowError::Recoverable(Error::Store(e)))?;
    logs.event(&format!(
        "event {}: priority {} persisted",
        incident.event_id,
        priority.code()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BatchFilters;

    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn test_config() -> TriageConfig {
        TriageConfig {
            database_url: "postgres://unused".to_string(),
            state_id: 96_719,
            agenda_id: 3_907_041,
            template_id: 0,
            batch_size: 5,
            log_dir: std::env::temp_dir()
                .join(format!("triage-orch-test-{}", std::process::id())),
        }
    }

    fn incident(id: i64, subject: &str) -> PendingIncident {
        PendingIncident {
            event_id: id,
            subject: subject.to_string(),
            description: None,
        }
    }

    #[derive(Default)]
    struct StoreProbe {
        insert_attempts: Cell<usize>,
        inserted: RefCell<Vec<(i64, String, &'static str)>>,
        closed: Cell<bool>,
    }

    struct FakeStore {
        probe: Rc<StoreProbe>,
        rows: Vec<PendingIncident>,
        fail_insert_for: Option<i64>,
    }

    impl IncidentStore for FakeStore {
        async fn fetch_pending(
            &mut self,
            _filters: &BatchFilters,
        ) -> Result<Vec<PendingIncident>, StoreError> {
            Ok(self.rows.clone())
        }

        async fn insert_classification(
            &mut self,
            event_id: i64,
            response: &str,
            priority: Priority,
        ) -> Result<(), StoreError> {
            self.probe.insert_attempts.set(self.probe.insert_attempts.get() + 1);
            if self.fail_insert_for == Some(event_id) {
                return Err(StoreError::Insert {
                    event_id,
                    source: sqlx::Error::RowNotFound,
                });
            }
            self.probe.inserted.borrow_mut().push((
                event_id,
                response.to_string(),
                priority.code(),
            ));
            Ok(())
        }

        async fn close(self) -> Result<(), StoreError> {
            self.probe.closed.set(true);
            Ok(())
        }
    }

    struct FakeModel {
        calls: Cell<usize>,
        replies: RefCell<VecDeque<TriageResult<String>>>,
    }

    impl FakeModel {
        fn with_replies(replies: Vec<TriageResult<String>>) -> Self {
            Self {
                calls: Cell::new(0),
                replies: RefCell::new(replies.into()),
            }
        }
    }

    impl PriorityModel for FakeModel {
        async fn classify_raw(&self, _prompt: &str) -> TriageResult<String> {
            self.calls.set(self.calls.get() + 1);
            self.replies
                .borrow_mut()
                .pop_front()
                .expect("unexpected model call")
        }
    }

    #[tokio::test]
    async fn empty_fetch_is_a_clean_noop() {
        let probe = Rc::new(StoreProbe::default());
        let store = FakeStore {
            probe: Rc::clone(&probe),
            rows: vec![],
            fail_insert_for: None,
        };
        let model = FakeModel::with_replies(vec![]);
        let cfg = test_config();
        let logs = RunLogs::create(&cfg.log_dir);

        let summary = run_batch(&cfg, store, &model, &logs).await.unwrap();

        assert_eq!(summary, TriageSummary::default());
        assert_eq!(model.calls.get(), 0);
        assert_eq!(probe.insert_attempts.get(), 0);
        assert!(probe.closed.get());
    }

    #[tokio::test]
    async fn each_row_is_classified_truncated_and_persisted() {
        let probe = Rc::new(StoreProbe::default());
        let store = FakeStore {
            probe: Rc::clone(&probe),
            rows: vec![incident(1, "Výpadek sítě"), incident(2, "Pomalý disk")],
            fail_insert_for: None,
        };
        let long_prose = "ž".repeat(150);
        let model = FakeModel::with_replies(vec![
            Ok("```json\n{\"priorita\":\"2\"}\n```".to_string()),
            Ok(long_prose.clone()),
        ]);
        let cfg = test_config();
        let logs = RunLogs::create(&cfg.log_dir);

        let summary = run_batch(&cfg, store, &model, &logs).await.unwrap();

        assert_eq!(
            summary,
            TriageSummary {
                fetched: 2,
                classified: 2,
                persisted: 2,
                skipped: 0,
            }
        );

        let inserted = probe.inserted.borrow();
        assert_eq!(inserted.len(), 2);

        // Structured reply: priority from the payload, raw text stored whole.
        assert_eq!(inserted[0].0, 1);
        assert_eq!(inserted[0].1, "```json\n{\"priorita\":\"2\"}\n```");
        assert_eq!(inserted[0].2, "2");

        // Prose reply: fallback priority, raw text cut to whole characters.
        assert_eq!(inserted[1].0, 2);
        assert_eq!(inserted[1].1, "ž".repeat(100));
        assert!(inserted[1].1.len() <= RESPONSE_BYTE_BUDGET);
        assert_eq!(inserted[1].2, "1");

        assert!(probe.closed.get());
    }

    #[tokio::test]
    async fn classifier_failure_aborts_batch_but_releases_connection() {
        let probe = Rc::new(StoreProbe::default());
        let store = FakeStore {
            probe: Rc::clone(&probe),
            rows: vec![incident(1, "a"), incident(2, "b"), incident(3, "c")],
            fail_insert_for: None,
        };
        let model = FakeModel::with_replies(vec![
            Ok("{\"priorita\":\"3\"}".to_string()),
            Err(Error::Inference("upstream unavailable".to_string())),
        ]);
        let cfg = test_config();
        let logs = RunLogs::create(&cfg.log_dir);

        let err = run_batch(&cfg, store, &model, &logs).await.unwrap_err();

        assert!(matches!(err, Error::Inference(_)));
        assert_eq!(model.calls.get(), 2);
        assert_eq!(probe.inserted.borrow().len(), 1);
        assert!(probe.closed.get());
    }

    #[tokio::test]
    async fn insert_failure_skips_the_row_and_continues() {
        let probe = Rc::new(StoreProbe::default());
        let store = FakeStore {
            probe: Rc::clone(&probe),
            rows: vec![incident(1, "a"), incident(2, "b")],
            fail_insert_for: Some(1),
        };
        let model = FakeModel::with_replies(vec![
            Ok("{\"priorita\":\"1\"}".to_string()),
            Ok("{\"priorita\":\"2\"}".to_string()),
        ]);
        let cfg = test_config();
        let logs = RunLogs::create(&cfg.log_dir);

        let summary = run_batch(&cfg, store, &model, &logs).await.unwrap();

        assert_eq!(
            summary,
            TriageSummary {
                fetched: 2,
                classified: 2,
                persisted: 1,
                skipped: 1,
            }
        );

        // Exactly one persistence attempt per fetched incident.
        assert_eq!(probe.insert_attempts.get(), 2);

        let inserted = probe.inserted.borrow();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].0, 2);
        assert_eq!(inserted[0].2, "2");
        assert!(probe.closed.get());
    }
}
