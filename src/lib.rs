//! Beer Tracker API Library
//!
//! # Overview
//!
//! 음주 기록(drink event)을 append-only로 저장하고, 저장된 로그로부터
//! 리더보드/일별 합계/점유율/벤더/히트맵 같은 리포트를 계산하는 백엔드.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐   ┌──────────────┐   ┌───────────────────┐  │
//! │  │ Routes  │──▶│ BeerTracker  │──▶│  EventStore       │  │
//! │  └────┬────┘   └──────┬───────┘   │  (SQLite/Memory)  │  │
//! │       │               │           └───────────────────┘  │
//! │       │               ▼                                  │
//! │       │        ┌──────────────┐                          │
//! │       └───────▶│   Geocoder   │──▶ Nominatim             │
//! │       │        └──────────────┘                          │
//! │       ▼                                                  │
//! │  ┌─────────┐   ┌──────────────┐                          │
//! │  │  stats  │   │   snapshot   │──▶ CSV                   │
//! │  └─────────┘   └──────────────┘                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 집계, 지오코딩, 로깅 워크플로우, CSV 스냅샷
//! - `db`: 이벤트 저장소 (SQLite)
//! - `types`: 이벤트 모델
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use beer_tracker_api::{db::Database, services::BeerTracker, types::NewDrinkEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Database::connect("sqlite://data/beer_tracker.db").await?;
//!     db.run_migrations().await?;
//!
//!     let tracker = BeerTracker::new(Arc::new(db), None);
//!     tracker
//!         .log(NewDrinkEvent {
//!             user_name: "Sam".into(),
//!             beer_count: 2,
//!             ..Default::default()
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ApiError;
pub use db::{Database, EventStore};
pub use services::{BeerTracker, Geocoder};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub tracker: Arc<BeerTracker>,
    /// 지오코딩 비활성화 시 None
    pub geocoder: Option<Arc<Geocoder>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, geocoder: Option<Arc<Geocoder>>, config: Config) -> Self {
        let tracker = BeerTracker::new(store.clone(), geocoder.clone());
        Self {
            store,
            tracker: Arc::new(tracker),
            geocoder,
            config: Arc::new(config),
        }
    }
}
