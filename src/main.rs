//! Beer Tracker API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Client (Frontend)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /health  /events/*  /stats/*                            ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  BeerTracker    stats    Geocoder    snapshot            ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Data Layer                            ││
//! │  │  SQLite event store    CSV snapshot                      ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Nominatim (geocoding, optional)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{http::HeaderValue, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 라이브러리에서 가져오기
use beer_tracker_api::{
    routes, services::snapshot, AppState, Config, Database, EventStore, Geocoder,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "beer_tracker_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🍺 Starting Beer Tracker API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!("📋 Configuration loaded");

    // 데이터베이스 연결
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("🗄️  Database connected");

    // 마이그레이션 실행
    db.run_migrations().await?;
    tracing::info!("📦 Migrations completed");

    // 빈 DB면 CSV 스냅샷으로 복원
    let store: Arc<dyn EventStore> = Arc::new(db);
    let restored = snapshot::restore_if_empty(store.as_ref(), &config.snapshot_path)
        .await
        .context("failed to restore from snapshot")?;
    if restored > 0 {
        tracing::info!("♻️  Restored {} events from {}", restored, config.snapshot_path.display());
    }

    // 지오코더 초기화 (실패해도 서버는 계속 동작)
    let geocoder = match &config.geocoder {
        Some(geocoder_config) => match Geocoder::from_config(geocoder_config) {
            Ok(geocoder) => {
                tracing::info!("🗺️  Geocoder ready ({})", geocoder_config.base_url);
                Some(Arc::new(geocoder))
            }
            Err(e) => {
                tracing::warn!("Geocoder unavailable, continuing without it: {}", e);
                None
            }
        },
        None => {
            tracing::info!("Geocoding disabled");
            None
        }
    };

    // 앱 상태 구성
    let state = AppState::new(store, geocoder, config.clone());

    // 라우터 구성
    let app = create_app(state);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 라우터 + 미들웨어
fn create_app(state: AppState) -> Router {
    // CORS 설정
    // 프로덕션에서는 ALLOWED_ORIGINS만 허용
    // 개발 환경에서는 localhost 허용
    let cors = if state.config.is_production() {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = [
            "http://localhost:5173",  // Vite dev server
            "http://localhost:3000",
            "http://127.0.0.1:5173",
            "http://localhost:8501",  // Streamlit
        ]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    routes::router(state)
        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
