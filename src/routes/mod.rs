//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/events` - 이벤트 기록/조회, CSV 내보내기, 백업
//! - `/stats/*` - 집계 리포트

pub mod health;
pub mod events;
pub mod stats;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// 라우터 생성 (미들웨어는 main에서 추가)
///
/// # Route Structure
///
/// ```text
/// GET  /health                       - 서버 상태 확인
///
/// POST /events                       - 이벤트 기록
/// GET  /events?start=&end=           - 기간 조회
/// GET  /events/export                - CSV 다운로드
/// POST /events/backup                - SNAPSHOT_PATH에 CSV 기록
///
/// GET  /stats/summary?days=          - 통계 페이지 전체
/// GET  /stats/leaderboard/:board     - users | cities | beer-types | bars
/// GET  /stats/daily?days=            - 일별 합계 (기본 365일)
/// GET  /stats/dominance?days=        - 상위권 점유율
/// GET  /stats/benders?threshold=     - 과음 세션
/// GET  /stats/benchmarks?days=       - 재미용 환산
/// GET  /stats/heatmap?by=            - city | coordinates
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Events
        .route("/events", post(events::log_event).get(events::list_events))
        .route("/events/export", get(events::export_events))
        .route("/events/backup", post(events::backup_events))

        // Stats
        .route("/stats/summary", get(stats::summary))
        .route("/stats/leaderboard/:board", get(stats::leaderboard))
        .route("/stats/daily", get(stats::daily))
        .route("/stats/dominance", get(stats::dominance))
        .route("/stats/benders", get(stats::benders))
        .route("/stats/benchmarks", get(stats::benchmarks))
        .route("/stats/heatmap", get(stats::heatmap))

        // 상태 주입
        .with_state(state)
}
