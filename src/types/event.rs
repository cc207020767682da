//! Drink Event Model
//!
//! One logged drinking session. Events are built only through
//! [`DrinkEvent::create`] (new submissions) or rehydrated from storage with the
//! same validation applied, so every value in circulation is normalized.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// country 컬럼이 없던 레거시 데이터의 기본 국가
pub const DEFAULT_COUNTRY: &str = "United States";

/// 이벤트 식별자
///
/// 새 이벤트는 UUID v4 문자열을 받지만, 스냅샷으로 복원된 이벤트는
/// 다른 형식(예: 정수 시퀀스)일 수 있으므로 불투명한 문자열로 취급함
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyEventId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 위도/경도 쌍
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(ValidationError::InvalidCoordinates(format!(
                "({latitude}, {longitude}) is outside the valid range"
            )));
        }
        Ok(Self { latitude, longitude })
    }
}

/// 로깅 요청 입력값 (검증 전)
///
/// `beer_count`는 음수 입력도 거부할 수 있도록 `i64`로 받음
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDrinkEvent {
    pub user_name: String,
    pub beer_count: i64,
    #[serde(default)]
    pub beer_type: Option<String>,
    #[serde(default)]
    pub bar_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// 미국 주 약어 (UI 관례일 뿐 country와의 결합은 강제하지 않음)
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// 기록된 음주 이벤트 (불변)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrinkEvent {
    event_id: EventId,
    timestamp_utc: DateTime<Utc>,
    user_name: String,
    beer_count: u32,
    beer_type: Option<String>,
    bar_name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl DrinkEvent {
    /// 새 이벤트 생성
    ///
    /// `event_id`와 `timestamp_utc`는 여기서 생성됨. 타임스탬프는 저장 포맷과
    /// 같은 마이크로초 정밀도로 자름
    pub fn create(input: NewDrinkEvent) -> Result<Self, ValidationError> {
        Self::restore(EventId::generate(), Utc::now().trunc_subsecs(6), input)
    }

    /// 저장소/스냅샷에서 읽은 이벤트 복원 (create와 동일한 검증 적용)
    pub(crate) fn restore(
        event_id: EventId,
        timestamp_utc: DateTime<Utc>,
        input: NewDrinkEvent,
    ) -> Result<Self, ValidationError> {
        let user_name = input.user_name.trim();
        if user_name.is_empty() {
            return Err(ValidationError::EmptyUserName);
        }

        let beer_count = u32::try_from(input.beer_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ValidationError::NonPositiveBeerCount(input.beer_count))?;

        let coordinates = match (input.latitude, input.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(ValidationError::InvalidCoordinates(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        };

        Ok(Self {
            event_id,
            timestamp_utc,
            user_name: user_name.to_string(),
            beer_count,
            beer_type: normalize(input.beer_type),
            bar_name: normalize(input.bar_name),
            city: normalize(input.city),
            state: normalize(input.state),
            country: normalize(input.country),
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
        })
    }

    /// 지오코딩 결과 부여 (저장 전에만 사용)
    pub(crate) fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.latitude = Some(coordinates.latitude);
        self.longitude = Some(coordinates.longitude);
        self
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn beer_count(&self) -> u32 {
        self.beer_count
    }

    pub fn beer_type(&self) -> Option<&str> {
        self.beer_type.as_deref()
    }

    pub fn bar_name(&self) -> Option<&str> {
        self.bar_name.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// 저장된 그대로의 country (레거시 행은 None)
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// 집계용 country: 없으면 "United States"
    pub fn country_or_default(&self) -> &str {
        self.country.as_deref().unwrap_or(DEFAULT_COUNTRY)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
