//! Error Handling Module
//!
//! Domain errors for the event model, store, geocoding and snapshot layers, plus
//! `ApiError` which maps them onto HTTP status codes.
//! Uses thiserror for domain errors and integrates with tracing for structured logging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ============ Domain Errors ============

/// 로깅 입력 검증 실패
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("user_name must be a non-empty string")]
    EmptyUserName,

    #[error("beer_count must be a positive integer, got {0}")]
    NonPositiveBeerCount(i64),

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("event_id must be non-empty")]
    EmptyEventId,
}

/// 이벤트 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate event_id: {0}")]
    DuplicateKey(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// 저장된 행을 이벤트로 복원할 수 없음
    #[error("corrupt row {event_id}: {reason}")]
    Corrupt { event_id: String, reason: String },
}

/// 지오코딩 실패 (호출자에게 전파되지 않고 로그만 남김)
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected geocoding response: {0}")]
    InvalidResponse(String),
}

/// CSV 스냅샷 에러
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 로깅 워크플로우 에러
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============ HTTP Errors ============

/// API 에러 타입
///
/// 각 에러 variant는 적절한 HTTP 상태 코드에 매핑됨.
/// 내부 에러의 상세 정보는 클라이언트에 노출하지 않음
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ============ 409 Conflict ============
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ 500 Internal Server Error ============
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalError,

    // ============ 503 Service Unavailable ============
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// API 에러 응답 구조
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // 4xx 클라이언트 에러
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(msg.clone()),
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Conflict".to_string(),
                Some(msg.clone()),
            ),

            // 5xx 서버 에러
            ApiError::DatabaseError(_) => {
                tracing::error!("Database error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(service) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                format!("{} is currently unavailable", service),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(id) => ApiError::Conflict(format!("event {id} already exists")),
            other => {
                tracing::error!("Store error: {:?}", other);
                ApiError::DatabaseError(other.to_string())
            }
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Validation(e) => e.into(),
            TrackerError::Store(e) => e.into(),
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Store(e) => e.into(),
            other => {
                tracing::error!("Snapshot error: {:?}", other);
                ApiError::InternalError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let resp = ApiError::from(ValidationError::EmptyUserName).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_key_maps_to_conflict() {
        let err: ApiError = StoreError::DuplicateKey("abc".to_string()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_tracker_store_error_maps_to_500() {
        let err: ApiError = TrackerError::Store(StoreError::Corrupt {
            event_id: "1".to_string(),
            reason: "bad timestamp".to_string(),
        })
        .into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_unavailable_maps_to_503() {
        let resp = ApiError::ServiceUnavailable("Geocoding".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
