use std::error::Error;

use incident_triage::{TriageConfig, run_triage};
use llm_service::{AnthropicConfig, AnthropicService};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// RFC3339 UTC timer via `chrono`, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file if present;
    // real deployments may supply plain process env instead.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,incident_triage=debug"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(ChronoRfc3339Utc::default())
                .compact(),
        )
        .init();

    let triage_cfg = TriageConfig::from_env()?;
    let model = AnthropicService::new(AnthropicConfig::from_env()?)?;

    // One batch pass; a fatal error propagates and yields a non-zero
    // exit status, a clean or empty run exits zero.
    let summary = run_triage(&triage_cfg, &model).await?;

    tracing::info!(
        fetched = summary.fetched,
        classified = summary.classified,
        persisted = summary.persisted,
        skipped = summary.skipped,
        "triage run finished"
    );

    Ok(())
}
