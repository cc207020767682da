//! Beer Tracker Service
//!
//! 로깅 워크플로우: 검증 → (선택) 지오코딩 → 저장
//!
//! 이벤트는 append-only이므로 좌표 보강은 저장 전에만 가능함.
//! 지오코딩 실패는 로깅을 실패시키지 않음 (좌표 없이 저장)

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::EventStore;
use crate::error::TrackerError;
use crate::services::geocoder::Geocoder;
use crate::types::{DrinkEvent, NewDrinkEvent};

pub struct BeerTracker {
    store: Arc<dyn EventStore>,
    geocoder: Option<Arc<Geocoder>>,
}

impl BeerTracker {
    pub fn new(store: Arc<dyn EventStore>, geocoder: Option<Arc<Geocoder>>) -> Self {
        Self { store, geocoder }
    }

    /// 이벤트 기록
    ///
    /// 검증 실패 시 저장소에 아무것도 쓰지 않음
    pub async fn log(&self, input: NewDrinkEvent) -> Result<DrinkEvent, TrackerError> {
        let mut event = DrinkEvent::create(input)?;

        let found = match (&self.geocoder, event.city()) {
            (Some(geocoder), Some(city)) if event.coordinates().is_none() => {
                geocoder
                    .locate(city, event.state(), Some(event.country_or_default()))
                    .await
            }
            _ => None,
        };
        if let Some(coordinates) = found {
            event = event.with_coordinates(coordinates);
        }

        self.store.insert(&event).await?;

        tracing::info!(
            event_id = %event.event_id(),
            user = event.user_name(),
            beer_count = event.beer_count(),
            geocoded = event.coordinates().is_some(),
            "drink logged"
        );

        Ok(event)
    }

    /// 기간 조회 (양 끝 포함, 시간순)
    pub async fn events(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DrinkEvent>, TrackerError> {
        Ok(self.store.fetch_range(start, end).await?)
    }
}
