//! Health Check Endpoint
//!
//! 저장소 연결 상태까지 확인하는 deep health check.
//! 지오코딩은 best-effort이므로 상태 판정에 포함하지 않음

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub geocoding_enabled: bool,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub latency_ms: Option<u64>,
    pub events: Option<u64>,
}

/// GET /health
///
/// 서버 및 의존성 상태 확인
pub async fn health_check(
    State(state): State<AppState>,
) -> Json<HealthResponse> {
    let db_start = std::time::Instant::now();
    let db_status = match state.store.health_check().await {
        Ok(()) => {
            let latency_ms = db_start.elapsed().as_millis() as u64;
            let events = match state.store.count().await {
                Ok(events) => Some(events),
                Err(e) => {
                    tracing::warn!(error = %e, "event count failed");
                    None
                }
            };
            DatabaseStatus {
                connected: true,
                latency_ms: Some(latency_ms),
                events,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            DatabaseStatus {
                connected: false,
                latency_ms: None,
                events: None,
            }
        }
    };

    Json(HealthResponse {
        status: if db_status.connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        geocoding_enabled: state.geocoder.is_some(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
