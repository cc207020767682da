//! Event Store Interface
//!
//! 이벤트 저장소 계약. 구현체는 두 가지:
//!
//! - `Database` (db/mod.rs): SQLite 기반 영속 저장소
//! - `MemoryEventStore`: 프로세스 내 저장소 (테스트, 데모용)
//!
//! 저장소는 append-only: 수정/삭제 연산은 계약에 없음

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::DrinkEvent;

/// Drink event 저장소 인터페이스
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 이벤트 1건 저장 (원자적). event_id 충돌 시 `DuplicateKey`
    async fn insert(&self, event: &DrinkEvent) -> Result<(), StoreError>;

    /// 전체 이벤트 (timestamp_utc 오름차순)
    async fn fetch_all(&self) -> Result<Vec<DrinkEvent>, StoreError> {
        self.fetch_range(None, None).await
    }

    /// 시간 범위 조회 (양 끝 포함)
    async fn fetch_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DrinkEvent>, StoreError>;

    /// 저장된 이벤트 수
    async fn count(&self) -> Result<u64, StoreError>;

    /// Health check
    async fn health_check(&self) -> Result<(), StoreError> {
        self.count().await.map(|_| ())
    }
}

/// 메모리 기반 저장소
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<DrinkEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: &DrinkEvent) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        if events.iter().any(|e| e.event_id() == event.event_id()) {
            return Err(StoreError::DuplicateKey(event.event_id().to_string()));
        }
        events.push(event.clone());
        Ok(())
    }

    async fn fetch_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DrinkEvent>, StoreError> {
        let events = self.events.read().await;
        let mut selected: Vec<DrinkEvent> = events
            .iter()
            .filter(|e| start.map_or(true, |s| e.timestamp_utc() >= s))
            .filter(|e| end.map_or(true, |t| e.timestamp_utc() <= t))
            .cloned()
            .collect();
        // stable sort: 같은 시각이면 삽입 순서 유지
        selected.sort_by_key(|e| e.timestamp_utc());
        Ok(selected)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.events.read().await.len() as u64)
    }
}
