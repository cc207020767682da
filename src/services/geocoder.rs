//! Geocoding Service
//!
//! Best-effort mapping from (city, state, country) to coordinates.
//!
//! - 실패(타임아웃, 결과 없음, 프로바이더 에러)는 모두 `None`으로 흡수되고
//!   `warn` 로그만 남김. 로깅/리포트 경로를 절대 막지 않음
//! - Nominatim 사용 정책에 따라 요청 간 최소 간격을 강제함 (동시 호출자는 대기열)
//! - 같은 쿼리는 TTL 동안 캐시 (에러는 캐시하지 않음). 만료 항목은 새 항목을
//!   넣을 때 정리됨

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::GeocoderConfig;
use crate::error::GeocodeError;
use crate::services::stats::{city_leaderboard, CityKey, HeatmapPoint, LeaderboardRow};
use crate::types::{Coordinates, DrinkEvent};

/// 외부 지오코딩 프로바이더
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// 자유 형식 장소 쿼리 → 좌표. 결과가 없으면 `Ok(None)`
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Nominatim (OpenStreetMap) 프로바이더
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimProvider {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeocodingProvider for NominatimProvider {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let parse = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| GeocodeError::InvalidResponse(format!("non-numeric coordinate `{raw}`")))
        };
        let coordinates = Coordinates::new(parse(&place.lat)?, parse(&place.lon)?)
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(Some(coordinates))
    }
}

/// 캐시 + rate limit을 적용한 지오코더
pub struct Geocoder {
    provider: Arc<dyn GeocodingProvider>,
    min_interval: Duration,
    /// 마지막 프로바이더 호출 시각
    last_request: Mutex<Option<Instant>>,
    cache: RwLock<HashMap<String, CachedLookup>>,
    cache_ttl: Duration,
}

struct CachedLookup {
    coordinates: Option<Coordinates>,
    cached_at: Instant,
}

impl Geocoder {
    /// 캐시 유효 시간 (초)
    const CACHE_TTL_SECS: u64 = 24 * 60 * 60;

    pub fn new(provider: Arc<dyn GeocodingProvider>, min_interval: Duration) -> Self {
        Self {
            provider,
            min_interval,
            last_request: Mutex::new(None),
            cache: RwLock::new(HashMap::new()),
            cache_ttl: Duration::from_secs(Self::CACHE_TTL_SECS),
        }
    }

    #[cfg(test)]
    fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// 설정으로부터 Nominatim 지오코더 생성
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let provider = NominatimProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), config.min_interval))
    }

    /// 도시 좌표 조회 (실패 시 None)
    pub async fn locate(
        &self,
        city: &str,
        state: Option<&str>,
        country: Option<&str>,
    ) -> Option<Coordinates> {
        let query = place_query(city, state, country)?;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&query) {
                if cached.cached_at.elapsed() < self.cache_ttl {
                    return cached.coordinates;
                }
            }
        }

        match self.throttled_lookup(&query).await {
            Ok(coordinates) => {
                if coordinates.is_none() {
                    tracing::info!(query = %query, "geocoding returned no match");
                }
                let mut cache = self.cache.write().await;
                cache.retain(|_, entry| entry.cached_at.elapsed() < self.cache_ttl);
                cache.insert(
                    query,
                    CachedLookup {
                        coordinates,
                        cached_at: Instant::now(),
                    },
                );
                coordinates
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "geocoding unavailable");
                None
            }
        }
    }

    /// 도시 그룹 배치 지오코딩. 좌표를 못 찾은 그룹은 결과에서 제외
    pub async fn enrich(&self, groups: &[LeaderboardRow<CityKey>]) -> Vec<HeatmapPoint> {
        let mut points = Vec::with_capacity(groups.len());
        for group in groups {
            let key = &group.key;
            let Some(coordinates) = self
                .locate(&key.city, key.state.as_deref(), Some(&key.country))
                .await
            else {
                continue;
            };
            points.push(HeatmapPoint {
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
                total_beers: group.total_beers,
                city: Some(key.city.clone()),
                state: key.state.clone(),
                country: Some(key.country.clone()),
            });
        }
        points
    }

    /// 도시별 히트맵: 도시 단위로 묶은 뒤 그룹당 1회만 조회
    pub async fn city_heatmap(&self, events: &[DrinkEvent]) -> Vec<HeatmapPoint> {
        let groups = city_leaderboard(events);
        tracing::debug!(groups = groups.len(), "enriching city groups");
        self.enrich(&groups).await
    }

    /// 최소 간격을 지켜 프로바이더 호출. 락을 잡은 채 호출하므로 요청은 직렬화됨
    async fn throttled_lookup(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        let result = self.provider.lookup(query).await;
        *last = Some(Instant::now());
        result
    }
}

/// "city, state, country" 쿼리 생성 (빈 값은 생략)
fn place_query(city: &str, state: Option<&str>, country: Option<&str>) -> Option<String> {
    let city = city.trim();
    if city.is_empty() {
        return None;
    }

    let parts: Vec<&str> = std::iter::once(city)
        .chain(state.map(str::trim))
        .chain(country.map(str::trim))
        .filter(|p| !p.is_empty())
        .collect();
    Some(parts.join(", "))
}


#[cfg(test)]
mod tests {
    use super::fake::FakeProvider;
    use super::*;
    use crate::types::{EventId, NewDrinkEvent};
    use chrono::Utc;

    fn geocoder(provider: Arc<FakeProvider>) -> Geocoder {
        Geocoder::new(provider, Duration::ZERO)
    }

    fn event_in(user: &str, count: i64, city: &str, state: Option<&str>) -> DrinkEvent {
        DrinkEvent::restore(
            EventId::generate(),
            Utc::now(),
            NewDrinkEvent {
                user_name: user.to_string(),
                beer_count: count,
                city: Some(city.to_string()),
                state: state.map(str::to_string),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_place_query() {
        assert_eq!(
            place_query("Ann Arbor", Some("MI"), Some("United States")).as_deref(),
            Some("Ann Arbor, MI, United States")
        );
        assert_eq!(
            place_query(" Milan ", None, Some("Italy")).as_deref(),
            Some("Milan, Italy")
        );
        assert_eq!(place_query("  ", Some("MI"), None), None);
    }

    #[tokio::test]
    async fn test_locate_resolves_and_caches() {
        let provider = Arc::new(FakeProvider::with(&[(
            "Ann Arbor, MI, United States",
            42.28,
            -83.74,
        )]));
        let geo = geocoder(provider.clone());

        let first = geo.locate("Ann Arbor", Some("MI"), Some("United States")).await;
        let second = geo.locate("Ann Arbor", Some("MI"), Some("United States")).await;

        assert_eq!(first, Some(Coordinates { latitude: 42.28, longitude: -83.74 }));
        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted() {
        let provider = Arc::new(FakeProvider::with(&[("Flint", 43.01, -83.69)]));
        let geo = geocoder(provider.clone()).with_cache_ttl(Duration::ZERO);

        for city in ["Flint", "Detroit", "Lansing"] {
            geo.locate(city, None, None).await;
        }
        assert_eq!(geo.cache.read().await.len(), 1);
        assert!(geo.cache.read().await.contains_key("Lansing"));

        // 만료된 쿼리는 다시 조회
        assert_eq!(
            geo.locate("Flint", None, None).await,
            Some(Coordinates { latitude: 43.01, longitude: -83.69 })
        );
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_fresh_entries_survive_insert() {
        let provider = Arc::new(FakeProvider::default());
        let geo = geocoder(provider.clone());

        for city in ["Flint", "Detroit", "Lansing"] {
            geo.locate(city, None, None).await;
        }
        assert_eq!(geo.cache.read().await.len(), 3);
        geo.locate("Detroit", None, None).await;
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_locate_failure_is_absorbed() {
        let provider = Arc::new(FakeProvider::failing());
        let geo = geocoder(provider.clone());

        assert_eq!(geo.locate("Ann Arbor", Some("MI"), None).await, None);
        // 에러는 캐시하지 않으므로 다시 시도함
        assert_eq!(geo.locate("Ann Arbor", Some("MI"), None).await, None);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_throttle_spaces_requests() {
        let provider = Arc::new(FakeProvider::default());
        let geo = Geocoder::new(provider.clone(), Duration::from_millis(60));

        geo.locate("A", None, None).await;
        geo.locate("B", None, None).await;
        geo.locate("C", None, None).await;

        let times = provider.call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(60));
        }
    }

    #[tokio::test]
    async fn test_city_heatmap_drops_unresolved() {
        let provider = Arc::new(FakeProvider::with(&[(
            "Ann Arbor, MI, United States",
            42.28,
            -83.74,
        )]));
        let geo = geocoder(provider.clone());
        let events = vec![
            event_in("A", 3, "Ann Arbor", Some("MI")),
            event_in("B", 4, "Atlantis", None),
            event_in("C", 2, "Ann Arbor", Some("MI")),
        ];

        let points = geo.city_heatmap(&events).await;

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].city.as_deref(), Some("Ann Arbor"));
        assert_eq!(points[0].total_beers, 5);
        // 그룹당 1회 조회
        assert_eq!(provider.calls(), 2);

        // 좌표 없는 도시도 리더보드에는 그대로 남음
        let board = city_leaderboard(&events);
        assert_eq!(board.len(), 2);
        assert_eq!(
            crate::services::stats::user_leaderboard(&events)
                .iter()
                .map(|r| r.total_beers)
                .sum::<u64>(),
            9
        );
    }
}
