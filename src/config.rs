//! Configuration Module
//!
//! 모든 설정은 환경변수에서 읽어 `Config`로 모은 뒤, 저장소/지오코더 생성자에
//! 명시적으로 전달함. 전역 상태는 없음.
//!
//! 필수 값이 잘못된 형식이면 from_env()에서 즉시 실패 (fail-fast)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::services::stats::{BenchmarkConstants, DEFAULT_BENDER_THRESHOLD};

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트 (기본값: 3001)
    pub port: u16,

    /// SQLite 연결 문자열
    /// 형식: sqlite://path/to/file.db
    pub database_url: String,

    /// CSV 스냅샷 경로 (백업/복원)
    pub snapshot_path: PathBuf,

    /// 지오코딩 설정 (None이면 비활성화)
    pub geocoder: Option<GeocoderConfig>,

    /// 벤더 판정 기준 (한 번에 마신 맥주 수)
    pub bender_threshold: u32,

    /// 재미용 환산 상수
    pub benchmarks: BenchmarkConstants,

    /// 프로덕션 CORS 허용 도메인
    pub allowed_origins: Vec<String>,

    /// 환경 (development, staging, production)
    pub environment: Environment,
}

/// 지오코딩 프로바이더 설정
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Nominatim 호환 API 주소
    pub base_url: String,

    /// 사용 정책상 필수인 User-Agent
    pub user_agent: String,

    /// 요청 타임아웃
    pub timeout: Duration,

    /// 요청 간 최소 간격 (rate limit)
    pub min_interval: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "beer-tracker-api".to_string(),
            timeout: Duration::from_secs(10),
            min_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// # Environment Variables (모두 옵션)
    ///
    /// - `PORT`: 서버 포트 (기본값: 3001)
    /// - `DATABASE_URL`: SQLite 연결 문자열 (기본값: sqlite://data/beer_tracker.db)
    /// - `SNAPSHOT_PATH`: CSV 백업 경로 (기본값: data/beer_events.csv)
    /// - `GEOCODING_ENABLED`: true | false
    /// - `GEOCODER_URL`, `GEOCODER_USER_AGENT`, `GEOCODER_TIMEOUT_SECS`, `GEOCODER_MIN_INTERVAL_MS`
    /// - `BENDER_THRESHOLD`: 벤더 판정 기준 (기본값: 7)
    /// - `BENCH_OUNCES_PER_BEER`, `BENCH_CALORIES_PER_BEER`, `BENCH_DOLLARS_PER_BEER`,
    ///   `BENCH_HORSE_WEIGHT_LB`, `BENCH_LABRADOODLE_WEIGHT_LB`
    /// - `ALLOWED_ORIGINS`: 콤마로 구분된 도메인 목록
    /// - `ENVIRONMENT`: development | staging | production
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let geocoder = if env_or("GEOCODING_ENABLED", true)? {
            let defaults = GeocoderConfig::default();
            Some(GeocoderConfig {
                base_url: env::var("GEOCODER_URL").unwrap_or(defaults.base_url),
                user_agent: env::var("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
                timeout: Duration::from_secs(env_or("GEOCODER_TIMEOUT_SECS", 10)?),
                min_interval: Duration::from_millis(env_or("GEOCODER_MIN_INTERVAL_MS", 1000)?),
            })
        } else {
            None
        };

        let bench = BenchmarkConstants::default();
        let benchmarks = BenchmarkConstants {
            ounces_per_beer: env_or("BENCH_OUNCES_PER_BEER", bench.ounces_per_beer)?,
            calories_per_beer: env_or("BENCH_CALORIES_PER_BEER", bench.calories_per_beer)?,
            dollars_per_beer: env_or("BENCH_DOLLARS_PER_BEER", bench.dollars_per_beer)?,
            horse_weight_lb: env_or("BENCH_HORSE_WEIGHT_LB", bench.horse_weight_lb)?,
            labradoodle_weight_lb: env_or(
                "BENCH_LABRADOODLE_WEIGHT_LB",
                bench.labradoodle_weight_lb,
            )?,
            ..bench
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            port: env_or("PORT", 3001)?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/beer_tracker.db".to_string()),

            snapshot_path: env::var("SNAPSHOT_PATH")
                .unwrap_or_else(|_| "data/beer_events.csv".to_string())
                .into(),

            geocoder,

            bender_threshold: env_or("BENDER_THRESHOLD", DEFAULT_BENDER_THRESHOLD)?,

            benchmarks,

            allowed_origins,

            environment,
        })
    }

    /// 프로덕션 환경인지 확인
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// 환경변수를 파싱하고, 없으면 기본값 사용
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid value, got `{raw}`")),
        Err(_) => Ok(default),
    }
}
