//! Per-cycle mention counts that form the trailing percentage baseline.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::DbError;

/// Record one mention count per keyword for a completed run.
///
/// Re-recording the same `(run_id, keyword_id)` pair overwrites the count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_keyword_counts(
    pool: &PgPool,
    run_id: i64,
    counts: &[(i64, i32)],
) -> Result<(), DbError> {
    if counts.is_empty() {
        return Ok(());
    }

    let (keyword_ids, mention_counts): (Vec<i64>, Vec<i32>) = counts.iter().copied().unzip();

    sqlx::query(
        "INSERT INTO keyword_cycle_counts (run_id, keyword_id, mention_count) \
         SELECT $1, k, c FROM UNNEST($2::bigint[], $3::int[]) AS t(k, c) \
         ON CONFLICT (run_id, keyword_id) DO UPDATE SET mention_count = EXCLUDED.mention_count",
    )
    .bind(run_id)
    .bind(&keyword_ids)
    .bind(&mention_counts)
    .execute(pool)
    .await?;

    Ok(())
}

/// Return up to `cycles` most recent counts per keyword, newest first.
///
/// Keywords with no recorded history are absent from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_keyword_counts(
    pool: &PgPool,
    keyword_ids: &[i64],
    cycles: i64,
) -> Result<HashMap<i64, Vec<i32>>, DbError> {
    if keyword_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, i32)> = sqlx::query_as(
        "SELECT keyword_id, mention_count FROM ( \
             SELECT keyword_id, mention_count, recorded_at, id, \
                    ROW_NUMBER() OVER ( \
                        PARTITION BY keyword_id ORDER BY recorded_at DESC, id DESC \
                    ) AS rn \
             FROM keyword_cycle_counts \
             WHERE keyword_id = ANY($1) \
         ) ranked \
         WHERE rn <= $2 \
         ORDER BY keyword_id, recorded_at DESC, id DESC",
    )
    .bind(keyword_ids)
    .bind(cycles)
    .fetch_all(pool)
    .await?;

    let mut history: HashMap<i64, Vec<i32>> = HashMap::new();
    for (keyword_id, count) in rows {
        history.entry(keyword_id).or_default().push(count);
    }

    Ok(history)
}
