//! Stats Endpoints
//!
//! 요청마다 저장소 전체를 읽어 새로 집계함 (캐시 없음).
//! `days`가 주어지면 최근 N일로 먼저 자른 뒤 집계

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    services::stats::{
        self, BarKey, BeerTypeKey, CityKey, DailyCount, DominanceSnapshot, FunBenchmarks,
        HeatmapPoint, LeaderboardRow, UserKey,
    },
    types::DrinkEvent,
    AppState,
};

/// daily 기본 조회 기간 (일)
const DEFAULT_DAILY_WINDOW: u32 = 365;

// ============ Request/Response Types ============

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BenderQuery {
    pub days: Option<u32>,
    pub threshold: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapMode {
    /// 도시 단위 지오코딩
    #[default]
    City,
    /// 이벤트에 저장된 좌표
    Coordinates,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub days: Option<u32>,
    #[serde(default)]
    pub by: HeatmapMode,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Board {
    Users,
    Cities,
    BeerTypes,
    Bars,
}

/// 보드 종류에 따라 키 모양이 다름
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LeaderboardResponse {
    Users(Vec<LeaderboardRow<UserKey>>),
    Cities(Vec<LeaderboardRow<CityKey>>),
    BeerTypes(Vec<LeaderboardRow<BeerTypeKey>>),
    Bars(Vec<LeaderboardRow<BarKey>>),
}

/// 통계 페이지 전체
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub window_days: Option<u32>,
    pub total_events: usize,
    pub total_beers: u64,
    pub total_volume: f64,
    pub users: Vec<LeaderboardRow<UserKey>>,
    pub cities: Vec<LeaderboardRow<CityKey>>,
    pub beer_types: Vec<LeaderboardRow<BeerTypeKey>>,
    pub bars: Vec<LeaderboardRow<BarKey>>,
    pub daily: Vec<DailyCount>,
    pub dominance: DominanceSnapshot,
    pub benders: Vec<DrinkEvent>,
    pub benchmarks: FunBenchmarks,
}

// ============ Handlers ============

/// GET /stats/summary?days=
pub async fn summary(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let events = load_window(&state, window.days).await?;
    let benchmarks = stats::fun_benchmarks(&events, &state.config.benchmarks);

    Ok(Json(SummaryResponse {
        window_days: window.days,
        total_events: events.len(),
        total_beers: benchmarks.total_beers,
        total_volume: stats::beers_to_gallons(benchmarks.total_beers),
        users: stats::user_leaderboard(&events),
        cities: stats::city_leaderboard(&events),
        beer_types: stats::beer_type_leaderboard(&events),
        bars: stats::bar_leaderboard(&events),
        daily: stats::daily_beer_counts(&events, window.days.unwrap_or(DEFAULT_DAILY_WINDOW)),
        dominance: stats::dominance_stats(&events),
        benders: stats::bender_stats(&events, state.config.bender_threshold),
        benchmarks,
    }))
}

/// GET /stats/leaderboard/:board?days=
///
/// board: users | cities | beer-types | bars
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(board): Path<Board>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let events = load_window(&state, window.days).await?;

    let response = match board {
        Board::Users => LeaderboardResponse::Users(stats::user_leaderboard(&events)),
        Board::Cities => LeaderboardResponse::Cities(stats::city_leaderboard(&events)),
        Board::BeerTypes => LeaderboardResponse::BeerTypes(stats::beer_type_leaderboard(&events)),
        Board::Bars => LeaderboardResponse::Bars(stats::bar_leaderboard(&events)),
    };
    Ok(Json(response))
}

/// GET /stats/daily?days= (기본 365일)
pub async fn daily(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
    let events = state.store.fetch_all().await?;
    let days = window.days.unwrap_or(DEFAULT_DAILY_WINDOW);
    Ok(Json(stats::daily_beer_counts(&events, days)))
}

/// GET /stats/dominance?days=
pub async fn dominance(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<DominanceSnapshot>, ApiError> {
    let events = load_window(&state, window.days).await?;
    Ok(Json(stats::dominance_stats(&events)))
}

/// GET /stats/benders?days=&threshold=
pub async fn benders(
    State(state): State<AppState>,
    Query(query): Query<BenderQuery>,
) -> Result<Json<Vec<DrinkEvent>>, ApiError> {
    let threshold = query.threshold.unwrap_or(state.config.bender_threshold);
    if threshold == 0 {
        return Err(ApiError::BadRequest("threshold must be positive".to_string()));
    }

    let events = load_window(&state, query.days).await?;
    Ok(Json(stats::bender_stats(&events, threshold)))
}

/// GET /stats/benchmarks?days=
pub async fn benchmarks(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<FunBenchmarks>, ApiError> {
    let events = load_window(&state, window.days).await?;
    Ok(Json(stats::fun_benchmarks(&events, &state.config.benchmarks)))
}

/// GET /stats/heatmap?days=&by=city|coordinates
///
/// city 모드는 지오코딩이 꺼져 있으면 503
pub async fn heatmap(
    State(state): State<AppState>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<Vec<HeatmapPoint>>, ApiError> {
    let geocoder = match (query.by, &state.geocoder) {
        (HeatmapMode::Coordinates, _) => None,
        (HeatmapMode::City, Some(geocoder)) => Some(geocoder),
        (HeatmapMode::City, None) => {
            return Err(ApiError::ServiceUnavailable("Geocoding".to_string()));
        }
    };

    let events = load_window(&state, query.days).await?;
    let points = match geocoder {
        Some(geocoder) => geocoder.city_heatmap(&events).await,
        None => stats::coordinate_heatmap(&events),
    };
    Ok(Json(points))
}

/// 저장소 전체 조회 후 기간 필터
async fn load_window(state: &AppState, days: Option<u32>) -> Result<Vec<DrinkEvent>, ApiError> {
    let events = state.store.fetch_all().await?;
    Ok(match days {
        Some(days) => stats::filter_last_n_days(&events, days),
        None => events,
    })
}
