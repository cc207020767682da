//! Event Endpoints
//!
//! 이벤트 기록/조회와 CSV 스냅샷 내보내기

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    services::snapshot,
    types::{ApiResponse, DrinkEvent, NewDrinkEvent},
    AppState,
};

// ============ Request/Response Types ============

/// 기간 쿼리 (RFC 3339, 양 끝 포함)
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<DrinkEvent>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub path: String,
    pub events: usize,
}

// ============ Handlers ============

/// POST /events
///
/// 이벤트 기록. 서버가 event_id와 timestamp_utc를 부여함
///
/// # Request
///
/// ```json
/// {
///   "user_name": "Sam",
///   "beer_count": 3,
///   "beer_type": "IPA",
///   "city": "Ann Arbor",
///   "state": "MI",
///   "country": "United States"
/// }
/// ```
pub async fn log_event(
    State(state): State<AppState>,
    Json(req): Json<NewDrinkEvent>,
) -> Result<(StatusCode, Json<DrinkEvent>), ApiError> {
    let event = state.tracker.log(req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /events?start=&end=
pub async fn list_events(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(ApiError::BadRequest("start must not be after end".to_string()));
        }
    }

    let events = state.tracker.events(range.start, range.end).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}

/// GET /events/export
///
/// 전체 이벤트 CSV 다운로드
pub async fn export_events(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.store.fetch_all().await?;

    let mut body = Vec::new();
    snapshot::export_csv(&events, &mut body)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"beer_events.csv\""),
        ],
        body,
    ))
}

/// POST /events/backup
///
/// 설정된 경로(SNAPSHOT_PATH)에 스냅샷 기록
pub async fn backup_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BackupResponse>>, ApiError> {
    let path = &state.config.snapshot_path;
    let events = snapshot::write_snapshot(state.store.as_ref(), path).await?;

    Ok(Json(ApiResponse::success(BackupResponse {
        path: path.display().to_string(),
        events,
    })))
}
