//! Database Models
//!
//! Row shape of the `drink_events` table and its conversion to the domain model.
//! Timestamps are stored as fixed-width RFC 3339 text (microseconds, `Z`) so that
//! lexical order in SQLite equals chronological order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::FromRow;

use crate::error::StoreError;
use crate::types::{DrinkEvent, EventId, NewDrinkEvent};

/// drink_events 테이블 행
#[derive(Debug, Clone, FromRow)]
pub struct DrinkEventRow {
    pub event_id: String,

    /// RFC 3339 (UTC, 마이크로초)
    pub timestamp_utc: String,

    pub user_name: String,

    pub beer_count: i64,

    pub beer_type: Option<String>,

    pub bar_name: Option<String>,

    pub city: Option<String>,

    pub state: Option<String>,

    /// 레거시 행은 NULL
    pub country: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,
}

/// 저장용 타임스탬프 포맷
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 타임스탬프 해석. 오프셋이 없으면 UTC로 간주
///
/// 이 크레이트가 쓴 값 외에 레거시 `isoformat()` 값(오프셋 없음)과
/// CSV 스냅샷의 변형 포맷도 받아들임
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .map(|naive| naive.and_utc())
        })?;

    Some(parsed.trunc_subsecs(6))
}

impl TryFrom<DrinkEventRow> for DrinkEvent {
    type Error = StoreError;

    fn try_from(row: DrinkEventRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            event_id: row.event_id.clone(),
            reason,
        };

        let timestamp = parse_timestamp(&row.timestamp_utc)
            .ok_or_else(|| corrupt(format!("unparseable timestamp `{}`", row.timestamp_utc)))?;
        let event_id = EventId::new(row.event_id.clone()).map_err(|e| corrupt(e.to_string()))?;

        DrinkEvent::restore(
            event_id,
            timestamp,
            NewDrinkEvent {
                user_name: row.user_name.clone(),
                beer_count: row.beer_count,
                beer_type: row.beer_type.clone(),
                bar_name: row.bar_name.clone(),
                city: row.city.clone(),
                state: row.state.clone(),
                country: row.country.clone(),
                latitude: row.latitude,
                longitude: row.longitude,
            },
        )
        .map_err(|e| corrupt(e.to_string()))
    }
}
