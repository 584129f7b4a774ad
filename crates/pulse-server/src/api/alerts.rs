use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use pulse_core::KeywordAlert;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AlertsQuery {
    pub unread: Option<bool>,
    pub limit: Option<i64>,
}

/// An alert with the keyword text it fired for.
#[derive(Debug, Serialize)]
pub(super) struct AlertItem {
    #[serde(flatten)]
    alert: KeywordAlert,
    keyword: String,
}

fn to_item(req_id: &str, row: pulse_db::KeywordAlertRow) -> Result<AlertItem, ApiError> {
    let keyword = row.keyword.clone();
    let alert = row
        .into_alert()
        .map_err(|e| map_db_error(req_id.to_string(), &e))?;
    Ok(AlertItem { alert, keyword })
}

pub(super) async fn list_alerts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<ApiResponse<Vec<AlertItem>>>, ApiError> {
    let rows = pulse_db::list_alerts(
        &state.pool,
        query.unread.unwrap_or(false),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| to_item(&req_id.0, row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Mark one alert read. Idempotent; read alerts never return to unread.
pub(super) async fn mark_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(alert_id): Path<i64>,
) -> Result<Json<ApiResponse<AlertItem>>, ApiError> {
    let row = pulse_db::mark_alert_read(&state.pool, alert_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(alert_id, "alert marked read");

    Ok(Json(ApiResponse {
        data: to_item(&req_id.0, row)?,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::AlertItem;
    use chrono::Utc;
    use pulse_core::{AlertPriority, AlertTrigger, KeywordAlert};

    #[test]
    fn alert_item_flattens_alert_fields() {
        let item = AlertItem {
            alert: KeywordAlert {
                id: 3,
                keyword_id: 1,
                content_item_id: None,
                detected_at: Utc::now(),
                is_read: false,
                alert_sent: false,
                trigger: AlertTrigger::Drop,
                observed_count: 0,
                baseline: Some(4.5),
                priority: Some(AlertPriority::High),
            },
            keyword: "solar".to_string(),
        };

        let json = serde_json::to_value(&item).expect("serialize alert item");
        assert_eq!(json["id"], 3);
        assert_eq!(json["keyword"], "solar");
        assert_eq!(json["trigger"], "drop");
        assert_eq!(json["priority"], "high");
        assert!(json["content_item_id"].is_null());
    }
}
