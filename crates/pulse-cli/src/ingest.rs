//! One-shot ingestion cycle from the command line.

use pulse_core::AppConfig;
use pulse_pipeline::{CycleOutcome, CycleReport, Trigger};

/// Run a single manual cycle against the configured providers.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be assembled or the keyword
/// registry cannot be read. Provider and per-item failures are reported in
/// the printed summary instead.
pub(crate) async fn run_once(config: &AppConfig, pool: sqlx::PgPool) -> anyhow::Result<()> {
    let pipeline = pulse_pipeline::build_orchestrator(config, pool)?;

    if pipeline.adapter_names().is_empty() {
        println!("no source adapters configured; set NEWS_API_KEY, NEWSAPI_AI_KEY, or SERPAPI_KEY");
        return Ok(());
    }

    tracing::info!(adapters = ?pipeline.adapter_names(), "running one ingestion cycle");
    match pipeline.run_cycle(Trigger::Manual).await? {
        CycleOutcome::Completed(report) => print!("{}", render_report(&report)),
        CycleOutcome::Skipped => println!("a cycle is already running; nothing to do"),
    }

    Ok(())
}

fn render_report(report: &CycleReport) -> String {
    let mut out = format!(
        "run {} {}\n",
        report
            .run_id
            .map_or_else(|| "-".to_string(), |id| id.to_string()),
        report.status().as_str()
    );
    for (label, value) in [
        ("keywords", report.keywords),
        ("fetched", report.fetched),
        ("matched", report.matched),
        ("admitted", report.admitted),
        ("resumed", report.resumed),
        ("duplicates", report.duplicates),
        ("failed writes", report.failed_writes),
        ("entity links", report.links),
        ("alerts", report.alerts),
    ] {
        out.push_str(&format!("  {label:<14}{value}\n"));
    }
    if !report.failed_adapters.is_empty() {
        out.push_str(&format!(
            "  failed adapters: {}\n",
            report.failed_adapters.join(", ")
        ));
    }
    if report.deadline_expired {
        out.push_str("  cycle deadline expired before all stages finished\n");
    }
    out
}
