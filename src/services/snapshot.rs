//! CSV Snapshot
//!
//! 이벤트 전체를 CSV로 내보내고, 같은 포맷의 파일로 빈 저장소를 재구성함.
//!
//! - export: 고정 컬럼 순서, RFC 3339 타임스탬프, 값이 없으면 빈 셀
//! - import: 컬럼 이름으로 매핑하므로 순서 무관. 선택 컬럼은 없어도 됨.
//!   타임스탬프를 해석할 수 없거나 검증에 실패한 행, 셀 개수가 헤더와
//!   다른 행은 건너뛰고 개수만 셈
//! - country 컬럼이 없거나 비어 있으면 "United States"

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;

use crate::db::{format_timestamp, parse_timestamp, EventStore};
use crate::error::{SnapshotError, StoreError};
use crate::types::{DrinkEvent, EventId, NewDrinkEvent, DEFAULT_COUNTRY};

/// 스냅샷 컬럼 (export 순서)
pub const SNAPSHOT_COLUMNS: [&str; 11] = [
    "event_id",
    "timestamp_utc",
    "user_name",
    "beer_count",
    "beer_type",
    "bar_name",
    "city",
    "state",
    "country",
    "latitude",
    "longitude",
];

const REQUIRED_COLUMNS: [&str; 4] = ["event_id", "timestamp_utc", "user_name", "beer_count"];

#[derive(Serialize)]
struct SnapshotRow<'a> {
    event_id: &'a str,
    timestamp_utc: String,
    user_name: &'a str,
    beer_count: u32,
    beer_type: Option<&'a str>,
    bar_name: Option<&'a str>,
    city: Option<&'a str>,
    state: Option<&'a str>,
    country: Option<&'a str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl<'a> From<&'a DrinkEvent> for SnapshotRow<'a> {
    fn from(event: &'a DrinkEvent) -> Self {
        Self {
            event_id: event.event_id().as_str(),
            timestamp_utc: format_timestamp(event.timestamp_utc()),
            user_name: event.user_name(),
            beer_count: event.beer_count(),
            beer_type: event.beer_type(),
            bar_name: event.bar_name(),
            city: event.city(),
            state: event.state(),
            country: event.country(),
            latitude: event.latitude(),
            longitude: event.longitude(),
        }
    }
}

/// import 결과
#[derive(Debug)]
pub struct ImportReport {
    pub events: Vec<DrinkEvent>,
    /// 해석할 수 없어 건너뛴 행 수
    pub skipped: usize,
}

/// 이벤트를 CSV로 기록 (빈 목록이어도 헤더는 씀)
pub fn export_csv<W: Write>(events: &[DrinkEvent], writer: W) -> Result<(), SnapshotError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(SNAPSHOT_COLUMNS)?;
    for event in events {
        writer.serialize(SnapshotRow::from(event))?;
    }
    writer.flush()?;
    Ok(())
}

/// CSV 스냅샷 파싱
pub fn import_csv<R: Read>(reader: R) -> Result<ImportReport, SnapshotError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_string(), idx))
        .collect();

    if let Some(missing) = REQUIRED_COLUMNS
        .into_iter()
        .find(|c| !columns.contains_key(*c))
    {
        return Err(SnapshotError::MissingColumn(missing));
    }

    let mut events = Vec::new();
    let mut skipped = 0;

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                skipped += 1;
                tracing::warn!(row = line + 1, error = %e, "skipping malformed snapshot row");
                continue;
            }
        };
        match parse_record(&columns, &record) {
            Ok(event) => events.push(event),
            Err(reason) => {
                skipped += 1;
                tracing::warn!(row = line + 1, reason = %reason, "skipping snapshot row");
            }
        }
    }

    Ok(ImportReport { events, skipped })
}

/// 이벤트를 순서대로 저장. 이미 있는 event_id는 건너뜀
///
/// 저장한 이벤트 수를 반환
pub async fn replay(store: &dyn EventStore, events: &[DrinkEvent]) -> Result<usize, StoreError> {
    let mut inserted = 0;
    for event in events {
        match store.insert(event).await {
            Ok(()) => inserted += 1,
            Err(StoreError::DuplicateKey(id)) => {
                tracing::warn!(event_id = %id, "event already present, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(inserted)
}

/// 저장소가 비어 있고 스냅샷 파일이 있으면 재구성
///
/// 복원한 이벤트 수를 반환 (아무것도 하지 않았으면 0)
pub async fn restore_if_empty(store: &dyn EventStore, path: &Path) -> Result<usize, SnapshotError> {
    if store.count().await? > 0 {
        return Ok(0);
    }
    if !tokio::fs::try_exists(path).await? {
        tracing::debug!(path = %path.display(), "no snapshot to restore");
        return Ok(0);
    }

    let bytes = tokio::fs::read(path).await?;
    let report = import_csv(bytes.as_slice())?;
    let restored = replay(store, &report.events).await?;

    tracing::info!(
        path = %path.display(),
        restored,
        skipped = report.skipped,
        "store rebuilt from snapshot"
    );
    Ok(restored)
}

/// 전체 이벤트를 스냅샷 파일로 기록 (상위 디렉터리 생성)
///
/// 기록한 이벤트 수를 반환
pub async fn write_snapshot(store: &dyn EventStore, path: &Path) -> Result<usize, SnapshotError> {
    let events = store.fetch_all().await?;

    let mut buffer = Vec::new();
    export_csv(&events, &mut buffer)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, buffer).await?;

    tracing::info!(path = %path.display(), events = events.len(), "snapshot written");
    Ok(events.len())
}

// ============ Row Parsing ============

fn parse_record(columns: &HashMap<String, usize>, record: &StringRecord) -> Result<DrinkEvent, String> {
    let cell = |name: &str| {
        columns
            .get(name)
            .and_then(|idx| record.get(*idx))
            .filter(|value| !value.is_empty())
    };
    let text = |name: &str| cell(name).map(str::to_string);
    let number = |name: &str| -> Result<Option<f64>, String> {
        cell(name)
            .map(|v| v.parse::<f64>().map_err(|_| format!("{name} `{v}` is not a number")))
            .transpose()
    };

    let raw_ts = cell("timestamp_utc").ok_or("missing timestamp")?;
    let timestamp = parse_timestamp(raw_ts).ok_or_else(|| format!("unparseable timestamp `{raw_ts}`"))?;

    let event_id = EventId::new(cell("event_id").unwrap_or_default()).map_err(|e| e.to_string())?;
    let beer_count = parse_count(cell("beer_count").unwrap_or_default())?;

    let input = NewDrinkEvent {
        user_name: cell("user_name").unwrap_or_default().to_string(),
        beer_count,
        beer_type: text("beer_type"),
        bar_name: text("bar_name"),
        city: text("city"),
        state: text("state"),
        country: Some(text("country").unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
        latitude: number("latitude")?,
        longitude: number("longitude")?,
    };

    DrinkEvent::restore(event_id, timestamp, input).map_err(|e| e.to_string())
}

/// 정수 또는 정수값 실수 ("3.0")
fn parse_count(raw: &str) -> Result<i64, String> {
    if let Ok(count) = raw.parse::<i64>() {
        return Ok(count);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(format!("beer_count `{raw}` is not an integer")),
    }
}
