use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulse_pipeline::{Trigger, TriggerStatus};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestionRunItem {
    id: i64,
    trigger_source: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    fetched: i32,
    matched: i32,
    admitted: i32,
    duplicates: i32,
    failed_writes: i32,
    links: i32,
    alerts: i32,
    error_message: Option<String>,
}

impl From<pulse_db::IngestionRunRow> for IngestionRunItem {
    fn from(row: pulse_db::IngestionRunRow) -> Self {
        Self {
            id: row.id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            fetched: row.fetched,
            matched: row.matched,
            admitted: row.admitted,
            duplicates: row.duplicates,
            failed_writes: row.failed_writes,
            links: row.links,
            alerts: row.alerts,
            error_message: row.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct TriggerAccepted {
    trigger: Trigger,
    status: TriggerStatus,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<IngestionRunItem>>>, ApiError> {
    let rows = pulse_db::list_ingestion_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(IngestionRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn enqueue(
    state: &AppState,
    req_id: RequestId,
    trigger: Trigger,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    let status = state.triggers.request(trigger);
    if status == TriggerStatus::Closed {
        return Err(ApiError::new(
            req_id.0,
            "unavailable",
            "ingestion driver is not running",
        ));
    }

    tracing::info!(%trigger, ?status, "ingestion cycle requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerAccepted { trigger, status },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// Queue a manual cycle. Coalesced if one is already pending.
pub(super) async fn request_manual_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    enqueue(&state, req_id, Trigger::Manual)
}

/// Signal from the admin layer that the keyword registry changed.
pub(super) async fn notify_keywords_changed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    enqueue(&state, req_id, Trigger::RegistryChanged)
}
