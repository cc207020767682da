//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `stats`: 순수 집계 함수 (리더보드, 일별 합계, 점유율, 벤더, 벤치마크)
//! - `Geocoder`: 도시 → 좌표 (캐시 + rate limit, 실패는 None)
//! - `BeerTracker`: 로깅 워크플로우 (검증 → 지오코딩 → 저장)
//! - `snapshot`: CSV 백업/복원

pub mod stats;
pub mod snapshot;
mod geocoder;
mod tracker;

pub use geocoder::{Geocoder, GeocodingProvider, NominatimProvider};
pub use snapshot::ImportReport;
pub use tracker::BeerTracker;
