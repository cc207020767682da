//! Aggregation Engine
//!
//! Pure functions turning the flat event log into derived views: leaderboards,
//! daily activity, dominance, bender detection, fun benchmarks and heatmap points.
//!
//! Every function accepts any slice (including an empty one) and returns an empty
//! view rather than an error when there is nothing to aggregate. Functions that
//! depend on "now" have an `_at` variant taking the reference instant explicitly.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DrinkEvent;

/// 맥주 1병 용량 (L)
pub const LITERS_PER_BEER: f64 = 0.33;
/// 1 US gallon (L)
pub const LITERS_PER_GALLON: f64 = 3.78541;
/// 벤더 판정 기본값 (한 번에 7병 이상)
pub const DEFAULT_BENDER_THRESHOLD: u32 = 7;

// ============ Output Types ============

/// 리더보드 한 행
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow<K> {
    #[serde(flatten)]
    pub key: K,
    pub total_beers: u64,
    /// 총량 (gallons, 소수점 2자리)
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserKey {
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CityKey {
    pub city: String,
    pub state: Option<String>,
    /// 레거시 행은 "United States"
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BeerTypeKey {
    pub beer_type: String,
}

/// 같은 이름의 술집을 구분하기 위해 도시/주를 포함
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BarKey {
    pub bar_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// 일별 합계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub beer_count: u64,
}

/// 상위권 점유율 (%)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DominanceSnapshot {
    pub top_1_pct: f64,
    pub top_3_pct: f64,
    pub everyone_else_pct: f64,
}

/// 환산 상수 (설정으로 교체 가능)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConstants {
    pub ounces_per_beer: f64,
    pub pounds_per_ounce: f64,
    pub calories_per_beer: f64,
    pub dollars_per_beer: f64,
    pub horse_weight_lb: f64,
    pub labradoodle_weight_lb: f64,
}

impl Default for BenchmarkConstants {
    fn default() -> Self {
        Self {
            ounces_per_beer: 12.0,
            pounds_per_ounce: 1.0 / 16.0,
            calories_per_beer: 100.0,
            dollars_per_beer: 6.0,
            horse_weight_lb: 1000.0,
            labradoodle_weight_lb: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FunBenchmarks {
    pub total_beers: u64,
    pub total_pounds: f64,
    pub total_calories: f64,
    pub horses_equivalent: f64,
    pub labradoodles_equivalent: f64,
    pub total_spent_usd: f64,
}

/// 히트맵 좌표
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub total_beers: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

// ============ Time Windows ============

/// 최근 `days`일 이벤트만 남김 (현재 시각 기준)
pub fn filter_last_n_days(events: &[DrinkEvent], days: u32) -> Vec<DrinkEvent> {
    filter_last_n_days_at(events, days, Utc::now())
}

pub fn filter_last_n_days_at(
    events: &[DrinkEvent],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DrinkEvent> {
    let cutoff = cutoff(days, now);
    events
        .iter()
        .filter(|e| e.timestamp_utc() >= cutoff)
        .cloned()
        .collect()
}

/// 최근 `days`일의 UTC 날짜별 합계 (날짜 오름차순)
pub fn daily_beer_counts(events: &[DrinkEvent], days: u32) -> Vec<DailyCount> {
    daily_beer_counts_at(events, days, Utc::now())
}

pub fn daily_beer_counts_at(
    events: &[DrinkEvent],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DailyCount> {
    let cutoff = cutoff(days, now);
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for event in events.iter().filter(|e| e.timestamp_utc() >= cutoff) {
        *per_day.entry(event.timestamp_utc().date_naive()).or_default() +=
            u64::from(event.beer_count());
    }
    per_day
        .into_iter()
        .map(|(date, beer_count)| DailyCount { date, beer_count })
        .collect()
}

/// 기간이 표현 범위를 넘으면 전체 기간으로 간주
fn cutoff(days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ============ Leaderboards ============

pub fn user_leaderboard(events: &[DrinkEvent]) -> Vec<LeaderboardRow<UserKey>> {
    leaderboard(events, |e| {
        Some(UserKey {
            user_name: e.user_name().to_string(),
        })
    })
}

/// 도시별 (city 없는 행 제외)
pub fn city_leaderboard(events: &[DrinkEvent]) -> Vec<LeaderboardRow<CityKey>> {
    leaderboard(events, |e| {
        e.city().map(|city| CityKey {
            city: city.to_string(),
            state: e.state().map(str::to_string),
            country: e.country_or_default().to_string(),
        })
    })
}

pub fn beer_type_leaderboard(events: &[DrinkEvent]) -> Vec<LeaderboardRow<BeerTypeKey>> {
    leaderboard(events, |e| {
        e.beer_type().map(|beer_type| BeerTypeKey {
            beer_type: beer_type.to_string(),
        })
    })
}

pub fn bar_leaderboard(events: &[DrinkEvent]) -> Vec<LeaderboardRow<BarKey>> {
    leaderboard(events, |e| {
        e.bar_name().map(|bar_name| BarKey {
            bar_name: bar_name.to_string(),
            city: e.city().map(str::to_string),
            state: e.state().map(str::to_string),
        })
    })
}

/// 공통 집계: 키별 합산 후 total_beers 내림차순
///
/// 그룹은 처음 등장한 순서로 쌓고 stable sort 하므로 동점 순서는 입력 순서로 결정됨
fn leaderboard<K, F>(events: &[DrinkEvent], key_of: F) -> Vec<LeaderboardRow<K>>
where
    K: Eq + Hash + Clone,
    F: Fn(&DrinkEvent) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut rows: Vec<LeaderboardRow<K>> = Vec::new();

    for event in events {
        let Some(key) = key_of(event) else {
            continue;
        };
        let beers = u64::from(event.beer_count());
        match index.get(&key) {
            Some(&i) => rows[i].total_beers += beers,
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(LeaderboardRow {
                    key,
                    total_beers: beers,
                    total_volume: 0.0,
                });
            }
        }
    }

    for row in &mut rows {
        row.total_volume = beers_to_gallons(row.total_beers);
    }
    rows.sort_by(|a, b| b.total_beers.cmp(&a.total_beers));
    rows
}

pub fn beers_to_gallons(total_beers: u64) -> f64 {
    round_to(total_beers as f64 * LITERS_PER_BEER / LITERS_PER_GALLON, 2)
}

// ============ Derived Metrics ============

/// 1위, 상위 3명, 나머지의 점유율 (맥주 수 기준, 소수점 1자리)
pub fn dominance_stats(events: &[DrinkEvent]) -> DominanceSnapshot {
    let board = user_leaderboard(events);
    let total: u64 = board.iter().map(|r| r.total_beers).sum();

    if total == 0 {
        return DominanceSnapshot {
            top_1_pct: 0.0,
            top_3_pct: 0.0,
            everyone_else_pct: 0.0,
        };
    }

    let top_1: u64 = board.iter().take(1).map(|r| r.total_beers).sum();
    let top_3: u64 = board.iter().take(3).map(|r| r.total_beers).sum();
    let pct = |part: u64| round_to(100.0 * part as f64 / total as f64, 1);

    let top_3_pct = pct(top_3);
    DominanceSnapshot {
        top_1_pct: pct(top_1),
        top_3_pct,
        everyone_else_pct: round_to(100.0 - top_3_pct, 1),
    }
}

/// 벤더: beer_count >= threshold 인 이벤트 (최신순)
pub fn bender_stats(events: &[DrinkEvent], threshold: u32) -> Vec<DrinkEvent> {
    let mut benders: Vec<DrinkEvent> = events
        .iter()
        .filter(|e| e.beer_count() >= threshold)
        .cloned()
        .collect();
    benders.sort_by(|a, b| b.timestamp_utc().cmp(&a.timestamp_utc()));
    benders
}

pub fn fun_benchmarks(events: &[DrinkEvent], constants: &BenchmarkConstants) -> FunBenchmarks {
    let total_beers: u64 = events.iter().map(|e| u64::from(e.beer_count())).sum();
    let beers = total_beers as f64;

    let total_ounces = beers * constants.ounces_per_beer;
    let total_pounds = total_ounces * constants.pounds_per_ounce;
    let per = |weight: f64, places: i32| {
        if weight > 0.0 {
            round_to(total_pounds / weight, places)
        } else {
            0.0
        }
    };

    FunBenchmarks {
        total_beers,
        total_pounds: round_to(total_pounds, 1),
        total_calories: round_to(beers * constants.calories_per_beer, 0),
        horses_equivalent: per(constants.horse_weight_lb, 2),
        labradoodles_equivalent: per(constants.labradoodle_weight_lb, 1),
        total_spent_usd: round_to(beers * constants.dollars_per_beer, 2),
    }
}

/// 저장된 좌표 기준 히트맵 (좌표 없는 이벤트 제외)
pub fn coordinate_heatmap(events: &[DrinkEvent]) -> Vec<HeatmapPoint> {
    let board = leaderboard(events, |e| {
        e.coordinates()
            .map(|c| (coordinate_bits(c.latitude), coordinate_bits(c.longitude)))
    });

    board
        .into_iter()
        .map(|row| HeatmapPoint {
            latitude: f64::from_bits(row.key.0),
            longitude: f64::from_bits(row.key.1),
            total_beers: row.total_beers,
            city: None,
            state: None,
            country: None,
        })
        .collect()
}

/// 좌표 그룹 키. -0.0과 0.0은 같은 지점
fn coordinate_bits(value: f64) -> u64 {
    if value == 0.0 {
        0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, NewDrinkEvent};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 18, 0, 0).unwrap()
    }

    fn event(user: &str, count: i64) -> NewDrinkEvent {
        NewDrinkEvent {
            user_name: user.to_string(),
            beer_count: count,
            ..Default::default()
        }
    }

    fn at(input: NewDrinkEvent, ts: DateTime<Utc>) -> DrinkEvent {
        DrinkEvent::restore(EventId::generate(), ts, input).unwrap()
    }

    fn log(entries: &[(&str, i64)]) -> Vec<DrinkEvent> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (user, count))| at(event(user, *count), now() - Duration::minutes(i as i64)))
            .collect()
    }

    #[test]
    fn test_user_leaderboard_sums_and_sorts() {
        let events = log(&[("A", 5), ("B", 3), ("A", 2)]);
        let board = user_leaderboard(&events);

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].key.user_name, "A");
        assert_eq!(board[0].total_beers, 7);
        assert_eq!(board[1].key.user_name, "B");
        assert_eq!(board[1].total_beers, 3);
        assert_eq!(board[0].total_volume, 0.61);
    }

    #[test]
    fn test_empty_inputs_give_empty_views() {
        assert!(user_leaderboard(&[]).is_empty());
        assert!(city_leaderboard(&[]).is_empty());
        assert!(beer_type_leaderboard(&[]).is_empty());
        assert!(bar_leaderboard(&[]).is_empty());
        assert!(daily_beer_counts_at(&[], 365, now()).is_empty());
        assert!(bender_stats(&[], 7).is_empty());
        assert!(coordinate_heatmap(&[]).is_empty());
        assert_eq!(fun_benchmarks(&[], &BenchmarkConstants::default()).total_beers, 0);
    }

    #[test]
    fn test_leaderboard_ties_follow_input_order() {
        let events = log(&[("C", 2), ("A", 2), ("B", 2)]);
        let names: Vec<_> = user_leaderboard(&events)
            .into_iter()
            .map(|r| r.key.user_name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let events = log(&[("A", 5), ("B", 3), ("A", 2), ("C", 9)]);
        assert_eq!(user_leaderboard(&events), user_leaderboard(&events));
        assert_eq!(dominance_stats(&events), dominance_stats(&events));
        assert_eq!(
            daily_beer_counts_at(&events, 30, now()),
            daily_beer_counts_at(&events, 30, now())
        );
        assert_eq!(bender_stats(&events, 7), bender_stats(&events, 7));
    }

    #[test]
    fn test_dominance_stats() {
        let events = log(&[("A", 5), ("B", 3), ("A", 2)]);
        let dom = dominance_stats(&events);
        assert_eq!(dom.top_1_pct, 70.0);
        assert_eq!(dom.top_3_pct, 100.0);
        assert_eq!(dom.everyone_else_pct, 0.0);
    }

    #[test]
    fn test_dominance_with_long_tail() {
        let events = log(&[("A", 4), ("B", 3), ("C", 2), ("D", 1)]);
        let dom = dominance_stats(&events);
        assert_eq!(dom.top_1_pct, 40.0);
        assert_eq!(dom.top_3_pct, 90.0);
        assert_eq!(dom.everyone_else_pct, 10.0);
    }

    #[test]
    fn test_dominance_empty_is_zero() {
        let dom = dominance_stats(&[]);
        assert_eq!(dom.top_1_pct, 0.0);
        assert_eq!(dom.top_3_pct, 0.0);
        assert_eq!(dom.everyone_else_pct, 0.0);
    }

    #[test]
    fn test_daily_beer_counts_groups_by_utc_date() {
        let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 7, d, h, 0, 0).unwrap();
        let events = vec![
            at(event("A", 1), day(3, 23)),
            at(event("B", 2), day(1, 10)),
            at(event("A", 3), day(2, 1)),
            at(event("C", 2), day(2, 22)),
        ];

        let daily = daily_beer_counts_at(&events, 365, now());
        assert_eq!(daily.len(), 3);
        assert_eq!(
            daily.iter().map(|d| d.beer_count).collect::<Vec<_>>(),
            vec![2, 5, 1]
        );
        assert_eq!(daily.iter().map(|d| d.beer_count).sum::<u64>(), 8);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_daily_beer_counts_with_wall_clock() {
        let now = Utc::now();
        let events = vec![
            at(event("A", 2), now - Duration::days(3)),
            at(event("B", 5), now - Duration::days(2)),
            at(event("C", 1), now - Duration::days(1)),
            at(event("D", 9), now - Duration::days(400)),
        ];

        let daily = daily_beer_counts(&events, 365);
        assert_eq!(daily.len(), 3);
        assert_eq!(daily.iter().map(|d| d.beer_count).sum::<u64>(), 8);
    }

    #[test]
    fn test_filter_last_n_days() {
        let events = vec![
            at(event("A", 1), now() - Duration::days(31)),
            at(event("B", 1), now() - Duration::days(29)),
            at(event("C", 1), now() - Duration::days(30)),
        ];
        let recent = filter_last_n_days_at(&events, 30, now());
        let names: Vec<_> = recent.iter().map(|e| e.user_name()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_oversized_window_keeps_everything() {
        let events = vec![
            at(event("A", 2), now() - Duration::days(4000)),
            at(event("B", 1), now()),
        ];

        assert!(daily_beer_counts_at(&[], 100_000_000, now()).is_empty());
        assert_eq!(filter_last_n_days_at(&events, u32::MAX, now()).len(), 2);

        let daily = daily_beer_counts_at(&events, u32::MAX, now());
        assert_eq!(daily.iter().map(|d| d.beer_count).sum::<u64>(), 3);
        assert_eq!(daily.len(), 2);
    }

    #[test]
    fn test_city_leaderboard_defaults_country_and_skips_missing_city() {
        let events = vec![
            at(
                NewDrinkEvent {
                    city: Some("Ann Arbor".into()),
                    state: Some("MI".into()),
                    ..event("A", 3)
                },
                now(),
            ),
            at(
                NewDrinkEvent {
                    city: Some("Ann Arbor".into()),
                    state: Some("MI".into()),
                    country: Some("United States".into()),
                    ..event("B", 2)
                },
                now(),
            ),
            at(
                NewDrinkEvent {
                    city: Some("Milan".into()),
                    country: Some("Italy".into()),
                    ..event("C", 4)
                },
                now(),
            ),
            at(event("D", 10), now()),
        ];

        let board = city_leaderboard(&events);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].key.city, "Ann Arbor");
        assert_eq!(board[0].key.country, "United States");
        assert_eq!(board[0].total_beers, 5);
        assert_eq!(board[1].key.city, "Milan");
        assert_eq!(board[1].key.state, None);
    }

    #[test]
    fn test_beer_type_and_bar_leaderboards_skip_missing() {
        let events = vec![
            at(
                NewDrinkEvent {
                    beer_type: Some("IPA".into()),
                    bar_name: Some("Skeeps".into()),
                    city: Some("Ann Arbor".into()),
                    ..event("A", 2)
                },
                now(),
            ),
            at(
                NewDrinkEvent {
                    bar_name: Some("Skeeps".into()),
                    city: Some("Chicago".into()),
                    ..event("B", 5)
                },
                now(),
            ),
            at(event("C", 1), now()),
        ];

        let types = beer_type_leaderboard(&events);
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].key.beer_type, "IPA");

        let bars = bar_leaderboard(&events);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].key.city.as_deref(), Some("Chicago"));
        assert_eq!(bars[0].total_beers, 5);
    }

    #[test]
    fn test_bender_stats_returns_matching_rows_newest_first() {
        let events = vec![
            at(event("A", 8), now() - Duration::hours(3)),
            at(event("B", 3), now() - Duration::hours(2)),
            at(event("C", 10), now() - Duration::hours(1)),
        ];

        let benders = bender_stats(&events, DEFAULT_BENDER_THRESHOLD);
        assert_eq!(benders.len(), 2);
        assert_eq!(benders[0].user_name(), "C");
        assert_eq!(benders[1].user_name(), "A");
        assert!(benders.iter().all(|e| e.beer_count() >= 7));
    }

    #[test]
    fn test_bender_threshold_is_inclusive() {
        let events = log(&[("A", 7), ("B", 6)]);
        assert_eq!(bender_stats(&events, 7).len(), 1);
    }

    #[test]
    fn test_fun_benchmarks_defaults() {
        let events = log(&[("A", 20), ("B", 20)]);
        let b = fun_benchmarks(&events, &BenchmarkConstants::default());

        assert_eq!(b.total_beers, 40);
        assert_eq!(b.total_pounds, 30.0);
        assert_eq!(b.total_calories, 4000.0);
        assert_eq!(b.horses_equivalent, 0.03);
        assert_eq!(b.labradoodles_equivalent, 0.5);
        assert_eq!(b.total_spent_usd, 240.0);
    }

    #[test]
    fn test_fun_benchmarks_overrides() {
        let events = log(&[("A", 4)]);
        let constants = BenchmarkConstants {
            calories_per_beer: 150.0,
            dollars_per_beer: 8.5,
            horse_weight_lb: 0.0,
            ..BenchmarkConstants::default()
        };
        let b = fun_benchmarks(&events, &constants);

        assert_eq!(b.total_calories, 600.0);
        assert_eq!(b.total_spent_usd, 34.0);
        assert_eq!(b.horses_equivalent, 0.0);
    }

    #[test]
    fn test_coordinate_heatmap_aggregates_by_point() {
        let here = |count: i64, lat: f64, lon: f64| {
            at(
                NewDrinkEvent {
                    latitude: Some(lat),
                    longitude: Some(lon),
                    ..event("A", count)
                },
                now(),
            )
        };
        let events = vec![
            here(2, 42.28, -83.74),
            here(3, 41.88, -87.63),
            here(4, 42.28, -83.74),
            at(event("B", 9), now()),
        ];

        let points = coordinate_heatmap(&events);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].latitude, 42.28);
        assert_eq!(points[0].total_beers, 6);
        assert_eq!(points[1].total_beers, 3);
    }

    #[test]
    fn test_coordinate_heatmap_merges_signed_zero() {
        let on_equator = |count: i64, lat: f64| {
            at(
                NewDrinkEvent {
                    latitude: Some(lat),
                    longitude: Some(10.0),
                    ..event("A", count)
                },
                now(),
            )
        };
        let events = vec![on_equator(1, 0.0), on_equator(2, -0.0)];

        let points = coordinate_heatmap(&events);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].total_beers, 3);
        assert!(points[0].latitude.is_sign_positive());
    }

    #[test]
    fn test_gallon_conversion() {
        assert_eq!(beers_to_gallons(0), 0.0);
        // 100 * 0.33 / 3.78541 = 8.7177...
        assert_eq!(beers_to_gallons(100), 8.72);
    }
}
