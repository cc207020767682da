//! Database Module
//!
//! SQLite 기반 이벤트 저장소.
//!
//! - 연결: SQLx `SqlitePool`, 파일이 없으면 생성
//! - 스키마: `migrations/` 의 버전별 마이그레이션을 open 시점에 1회 실행.
//!   SQLx가 적용된 버전을 `_sqlx_migrations`에 기록하므로 재실행은 no-op.
//!   `country` 컬럼은 SQLite에 `ADD COLUMN IF NOT EXISTS`가 없어서
//!   `pragma_table_info`로 확인 후 추가
//! - append-only: insert와 조회만 제공

mod models;
mod repository;

pub use models::{format_timestamp, parse_timestamp, DrinkEventRow};
pub use repository::{EventStore, MemoryEventStore};

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::StoreError;
use crate::types::DrinkEvent;

const SELECT_EVENTS: &str = r#"
    SELECT
        event_id,
        timestamp_utc,
        user_name,
        beer_count,
        beer_type,
        bar_name,
        city,
        state,
        country,
        latitude,
        longitude
    FROM drink_events
"#;

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 5 (사람이 직접 입력하는 저빈도 워크로드)
    /// - acquire_timeout: 3초
    pub async fn connect(database_url: &str) -> Result<Self> {
        ensure_parent_dir(database_url)?;

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid DATABASE_URL `{database_url}`"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await
            .context("failed to open sqlite database")?;

        Ok(Self { pool })
    }

    /// 인메모리 데이터베이스 (테스트용)
    ///
    /// `:memory:` DB는 커넥션마다 별개이므로 커넥션 1개를 계속 유지함
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    ///
    /// SQL 마이그레이션 후 `country` 컬럼을 보장함. 기존 DB 파일은
    /// `country`가 있는 스키마일 수도 없는 스키마일 수도 있으므로
    /// 컬럼 추가는 존재 여부를 확인한 뒤에만 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        self.ensure_country_column().await?;
        Ok(())
    }

    async fn ensure_country_column(&self) -> Result<()> {
        let (present,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pragma_table_info('drink_events') WHERE name = 'country'",
        )
        .fetch_one(&self.pool)
        .await?;

        if present == 0 {
            sqlx::query("ALTER TABLE drink_events ADD COLUMN country TEXT")
                .execute(&self.pool)
                .await
                .context("failed to add country column")?;
            tracing::info!("added country column to drink_events");
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EventStore for Database {
    async fn insert(&self, event: &DrinkEvent) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO drink_events (
                event_id, timestamp_utc, user_name, beer_count, beer_type,
                bar_name, city, state, country, latitude, longitude
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.event_id().as_str())
        .bind(format_timestamp(event.timestamp_utc()))
        .bind(event.user_name())
        .bind(i64::from(event.beer_count()))
        .bind(event.beer_type())
        .bind(event.bar_name())
        .bind(event.city())
        .bind(event.state())
        .bind(event.country())
        .bind(event.latitude())
        .bind(event.longitude())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(
                    event_id = %event.event_id(),
                    user = event.user_name(),
                    beer_count = event.beer_count(),
                    "event stored"
                );
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateKey(event.event_id().to_string()))
            }
            Err(e) => Err(StoreError::Storage(e)),
        }
    }

    async fn fetch_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DrinkEvent>, StoreError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_EVENTS);
        query.push(" WHERE 1 = 1");
        if let Some(start) = start {
            query.push(" AND timestamp_utc >= ").push_bind(format_timestamp(start));
        }
        if let Some(end) = end {
            query.push(" AND timestamp_utc <= ").push_bind(format_timestamp(end));
        }
        query.push(" ORDER BY timestamp_utc ASC, rowid ASC");

        let rows = query
            .build_query_as::<DrinkEventRow>()
            .fetch_all(&self.pool)
            .await?;

        // 복원할 수 없는 행은 건너뜀 (리포트 전체를 실패시키지 않음)
        let events = rows
            .into_iter()
            .filter_map(|row| match DrinkEvent::try_from(row) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable row");
                    None
                }
            })
            .collect();
        Ok(events)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM drink_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count.0).unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// 파일 DB의 상위 디렉터리 생성 (sqlite는 디렉터리를 만들지 않음)
fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or_default();

    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}
