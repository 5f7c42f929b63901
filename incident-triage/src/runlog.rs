//! Per-run side-file logs.
//!
//! Two append-only text files per run under the configured directory:
//! - `output-<millis>.log`: free-form event log mirroring run milestones;
//! - `table-<millis>.log`: fixed-width snapshot of the fetched batch.
//!
//! Observability output only. Every write is best-effort: failures are
//! logged at DEBUG and never fail the run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::PendingIncident;

/// Handles to the two side logs of one run.
#[derive(Debug)]
pub struct RunLogs {
    event_path: PathBuf,
    table_path: PathBuf,
}

impl RunLogs {
    /// Prepares the log directory and derives per-run file names from the
    /// current timestamp.
    pub fn create(dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(dir) {
            debug!("could not create log directory {}: {e}", dir.display());
        }
        let millis = chrono::Utc::now().timestamp_millis();
        Self {
            event_path: dir.join(format!("output-{millis}.log")),
            table_path: dir.join(format!("table-{millis}.log")),
        }
    }

    /// Appends one line to the event log.
    pub fn event(&self, line: &str) {
        append_line(&self.event_path, line);
    }

    /// Appends a fixed-width snapshot of the fetched batch.
    pub fn table(&self, incidents: &[PendingIncident]) {
        append_line(&self.table_path, &render_table(incidents));
    }
}

fn append_line(path: &Path, content: &str) {
    let write = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{content}"));
    if let Err(e) = write {
        debug!("run log write failed for {}: {e}", path.display());
    }
}

/// Renders the batch as fixed-width columns, console-table style.
fn render_table(incidents: &[PendingIncident]) -> String {
    const HEADERS: [&str; 3] = ["EVENT_ID", "EVENT_SUBJECT", "EVENT_DESC"];

    let rows: Vec<[String; 3]> = incidents
        .iter()
        .map(|i| {
            [
                i.event_id.to_string(),
                i.subject.clone(),
                i.description.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = [0usize; 3];
    for (w, h) in widths.iter_mut().zip(HEADERS) {
        *w = h.chars().count();
    }
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(String::from), &widths);
    push_row(&mut out, &widths.map(|w| "-".repeat(w)), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 3], widths: &[usize; 3]) {
    for (i, (cell, w)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(cell);
        for _ in cell.chars().count()..*w {
            out.push(' ');
        }
    }
    // Trailing spaces on the last column are dropped.
    while out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: i64, subject: &str, desc: Option<&str>) -> PendingIncident {
        PendingIncident {
            event_id: id,
            subject: subject.to_string(),
            description: desc.map(String::from),
        }
    }

    #[test]
    fn table_aligns_columns_and_blanks_missing_description() {
        let rows = vec![
            incident(7, "Výpadek", Some("VPN nejede")),
            incident(123456, "Tiskárna", None),
        ];
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("EVENT_ID  EVENT_SUBJECT"));
        assert!(lines[1].starts_with("--------  "));
        assert!(lines[2].starts_with("7 "));
        assert!(lines[3].starts_with("123456 "));
        assert!(lines[3].ends_with("Tiskárna"));
    }

    #[test]
    fn event_log_appends_lines() {
        let dir = std::env::temp_dir().join(format!(
            "triage-runlog-test-{}",
            std::process::id()
        ));
        let logs = RunLogs::create(&dir);
        logs.event("first");
        logs.event("second");
        let content = fs::read_to_string(&logs.event_path).unwrap();
        assert_eq!(content, "first\nsecond\n");
        let _ = fs::remove_dir_all(&dir);
    }
}
