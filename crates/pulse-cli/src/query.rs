//! Read-only alert and run listings.

/// Print recent alerts.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn list_alerts(
    pool: &sqlx::PgPool,
    unread_only: bool,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = pulse_db::list_alerts(pool, unread_only, limit.clamp(1, 200)).await?;

    if rows.is_empty() {
        println!(
            "no {}alerts found",
            if unread_only { "unread " } else { "" }
        );
        return Ok(());
    }

    println!(
        "{:<8}{:<18}{:<25}{:<11}{:<9}{:<8}{:<10}READ",
        "ID", "DETECTED", "KEYWORD", "TRIGGER", "PRIORITY", "COUNT", "BASELINE"
    );
    for row in &rows {
        let detected = row.detected_at.format("%Y-%m-%d %H:%M").to_string();
        let baseline = row
            .baseline
            .map_or_else(|| "-".to_string(), |b| format!("{b:.1}"));
        println!(
            "{:<8}{:<18}{:<25}{:<11}{:<9}{:<8}{:<10}{}",
            row.id,
            detected,
            row.keyword,
            row.trigger_kind,
            row.priority.as_deref().unwrap_or("-"),
            row.observed_count,
            baseline,
            if row.is_read { "yes" } else { "no" }
        );
    }

    Ok(())
}

/// Print recent ingestion runs.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = pulse_db::list_ingestion_runs(pool, limit.clamp(1, 200)).await?;

    if runs.is_empty() {
        println!("no ingestion runs recorded; run `ingest run` first");
        return Ok(());
    }

    println!(
        "{:<8}{:<18}{:<18}{:<11}{:<9}{:<9}{:<7}ERROR",
        "ID", "STARTED", "TRIGGER", "STATUS", "FETCHED", "ADMITTED", "ALERTS"
    );
    for run in &runs {
        let started = run.started_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<8}{:<18}{:<18}{:<11}{:<9}{:<9}{:<7}{}",
            run.id,
            started,
            run.trigger_source,
            run.status,
            run.fetched,
            run.admitted,
            run.alerts,
            run.error_message.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
