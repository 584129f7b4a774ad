use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulse_core::ContentItem;
use pulse_db::ContentItemFilter;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ItemsQuery {
    pub keyword: Option<String>,
    pub platform: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl ItemsQuery {
    fn into_filter(self, req_id: &str) -> Result<(ContentItemFilter, i64), ApiError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from >= to {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    "'from' must be earlier than 'to'",
                ));
            }
        }

        let filter = ContentItemFilter {
            keyword: self.keyword.filter(|k| !k.trim().is_empty()),
            platform: self.platform.filter(|p| !p.trim().is_empty()),
            from: self.from,
            to: self.to,
        };
        Ok((filter, normalize_limit(self.limit)))
    }
}

pub(super) async fn list_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ApiResponse<Vec<ContentItem>>>, ApiError> {
    let (filter, limit) = query.into_filter(&req_id.0)?;

    let rows = pulse_db::list_content_items(&state.pool, &filter, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ContentItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
