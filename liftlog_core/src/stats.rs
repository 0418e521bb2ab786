//! Time-windowed workout aggregates with a granular cache.
//!
//! Every operation takes the user and a window and answers from the cache
//! when a live entry exists; otherwise it recomputes from the store and
//! repopulates. Intermediate math keeps full precision; results are
//! rounded to 2 decimals at the aggregate boundary. Cache keys come from
//! [`crate::cache::keys`] and are scoped per user.

use crate::cache::{keys, StatsCache};
use crate::config::CacheConfig;
use crate::formulas::{estimated_one_rep_max, round2};
use crate::{Result, Store, Workout};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Duration bucket labels, in display order
pub const DURATION_BUCKETS: [&str; 4] = ["< 30 min", "30-60 min", "60-90 min", "90+ min"];

// ============================================================================
// Aggregate result types
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub volume: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeekdayVolume {
    pub date: NaiveDate,
    pub day_label: String,
    pub volume: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeeklyVolumeComparison {
    pub current_week_volume: f64,
    pub previous_week_volume: f64,
    pub difference: f64,
    pub percentage: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MonthlyVolumeComparison {
    pub current_month_volume: f64,
    pub previous_month_volume: f64,
    pub difference: f64,
    pub percentage: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutVolume {
    pub date: NaiveDate,
    pub name: String,
    pub volume: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MonthlyVolume {
    /// `YYYY-MM`
    pub month: String,
    pub volume: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DurationPoint {
    pub date: NaiveDate,
    pub name: String,
    pub minutes: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DurationBucket {
    pub label: String,
    pub count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BodyMetricsSummary {
    pub latest_weight: Option<f64>,
    pub weight_change: f64,
    pub latest_body_fat: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BodyFatPoint {
    pub date: NaiveDate,
    pub body_fat: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OneRmPoint {
    pub date: NaiveDate,
    pub one_rep_max: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MuscleVolume {
    pub category: String,
    pub volume: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecentWorkout {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub volume: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecentRecord {
    pub exercise_id: Uuid,
    pub kind: String,
    pub value: f64,
    pub achieved_at: DateTime<Utc>,
}

/// Dashboard snapshot, cached whole under `dashboard_data_{user}`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardData {
    pub workouts_count: u64,
    pub this_week_count: u64,
    pub latest_weight: Option<f64>,
    pub recent_workouts: Vec<RecentWorkout>,
    pub recent_records: Vec<RecentRecord>,
    pub weekly: WeeklyVolumeComparison,
}

// ============================================================================
// Service
// ============================================================================

/// Read-side aggregation over the store, backed by the stats cache
pub struct StatsService<'a> {
    store: &'a Store,
    cache: &'a mut StatsCache,
    stats_ttl: Duration,
    dashboard_ttl: Duration,
}

impl<'a> StatsService<'a> {
    pub fn new(store: &'a Store, cache: &'a mut StatsCache, config: &CacheConfig) -> Self {
        Self {
            store,
            cache,
            stats_ttl: config.stats_ttl(),
            dashboard_ttl: config.dashboard_ttl(),
        }
    }

    /// Volume per calendar day for the last `days` days, oldest first,
    /// zero-filled
    pub fn daily_volume_trend(
        &mut self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyVolume>> {
        let store = self.store;
        self.cache
            .remember(&keys::daily_volume(user_id, days), self.stats_ttl, now, || {
                compute_daily_volume_trend(store, user_id, days, now)
            })
    }

    /// Seven entries for the current Monday-start week
    pub fn weekly_volume_trend(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<WeekdayVolume>> {
        let store = self.store;
        self.cache
            .remember(&keys::weekly_volume(user_id), self.stats_ttl, now, || {
                compute_weekly_volume_trend(store, user_id, now)
            })
    }

    /// Current vs previous calendar week
    pub fn weekly_volume_comparison(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<WeeklyVolumeComparison> {
        let store = self.store;
        self.cache.remember(
            &keys::weekly_volume_comparison(user_id),
            self.stats_ttl,
            now,
            || compute_weekly_comparison(store, user_id, now),
        )
    }

    /// Current vs previous calendar month
    pub fn monthly_volume_comparison(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<MonthlyVolumeComparison> {
        let store = self.store;
        self.cache.remember(
            &keys::monthly_volume_comparison(user_id),
            self.stats_ttl,
            now,
            || {
                let c = compute_monthly_comparison(store, user_id, now);
                MonthlyVolumeComparison {
                    current_month_volume: c.0,
                    previous_month_volume: c.1,
                    difference: c.2,
                    percentage: c.3,
                }
            },
        )
    }

    /// Volume per workout within the last `days` days, chronological
    pub fn volume_trend(
        &mut self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkoutVolume>> {
        let store = self.store;
        self.cache
            .remember(&keys::volume_trend(user_id, days), self.stats_ttl, now, || {
                let cutoff = now - Duration::days(i64::from(days));
                let mut workouts: Vec<&Workout> = store
                    .workouts_for(user_id)
                    .filter(|w| w.started_at >= cutoff)
                    .collect();
                workouts.sort_by_key(|w| w.started_at);
                workouts.into_iter().map(workout_volume_item).collect()
            })
    }

    /// Volume per completed workout, most recent `limit`, chronological.
    /// In-progress workouts are excluded regardless of their sets.
    pub fn volume_history(
        &mut self,
        user_id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkoutVolume>> {
        let store = self.store;
        self.cache
            .remember(&keys::volume_history(user_id, limit), self.stats_ttl, now, || {
                recent_completed(store, user_id, limit)
                    .into_iter()
                    .map(workout_volume_item)
                    .collect()
            })
    }

    /// Volume per calendar month for the last `months` months, oldest
    /// first, zero-filled
    pub fn monthly_volume_history(
        &mut self,
        user_id: Uuid,
        months: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonthlyVolume>> {
        let store = self.store;
        self.cache.remember(
            &keys::monthly_volume_history(user_id, months),
            self.stats_ttl,
            now,
            || compute_monthly_volume_history(store, user_id, months, now),
        )
    }

    /// Duration in minutes per completed workout, most recent `limit`,
    /// chronological
    pub fn duration_history(
        &mut self,
        user_id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DurationPoint>> {
        let store = self.store;
        self.cache.remember(
            &keys::duration_history(user_id, limit),
            self.stats_ttl,
            now,
            || {
                recent_completed(store, user_id, limit)
                    .into_iter()
                    .map(|w| DurationPoint {
                        date: w.day(),
                        name: w.name.clone(),
                        minutes: w.duration_minutes().unwrap_or(0),
                    })
                    .collect()
            },
        )
    }

    /// Fixed duration buckets over completed workouts in the window.
    /// Boundaries are inclusive-lower: [0,30), [30,60), [60,90), [90,inf).
    pub fn duration_distribution(
        &mut self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DurationBucket>> {
        let store = self.store;
        self.cache.remember(
            &keys::duration_distribution(user_id, days),
            self.stats_ttl,
            now,
            || compute_duration_distribution(store, user_id, days, now),
        )
    }

    /// Latest weight and body fat, plus the change against the
    /// immediately preceding measurement. Cheap single-row reads; not
    /// cached.
    pub fn latest_body_metrics(&self, user_id: Uuid) -> BodyMetricsSummary {
        let measurements = self.store.measurements_for(user_id);
        let latest = measurements.last();
        let previous = measurements.len().checked_sub(2).and_then(|i| measurements.get(i));

        let weight_change = match (latest, previous) {
            (Some(l), Some(p)) => round2(l.weight - p.weight),
            _ => 0.0,
        };

        BodyMetricsSummary {
            latest_weight: latest.map(|m| m.weight),
            weight_change,
            latest_body_fat: latest.and_then(|m| m.body_fat),
        }
    }

    /// Weight measurements in the window, chronological
    pub fn weight_history(
        &mut self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WeightPoint>> {
        let store = self.store;
        self.cache
            .remember(&keys::weight_history(user_id, days), self.stats_ttl, now, || {
                let cutoff = now - Duration::days(i64::from(days));
                store
                    .measurements_for(user_id)
                    .into_iter()
                    .filter(|m| m.measured_at >= cutoff)
                    .map(|m| WeightPoint {
                        date: m.measured_at.date_naive(),
                        weight: round2(m.weight),
                    })
                    .collect()
            })
    }

    /// Body-fat measurements in the window, chronological; measurements
    /// without a body-fat reading are skipped
    pub fn body_fat_history(
        &mut self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<BodyFatPoint>> {
        let store = self.store;
        self.cache.remember(
            &keys::body_fat_history(user_id, days),
            self.stats_ttl,
            now,
            || {
                let cutoff = now - Duration::days(i64::from(days));
                store
                    .measurements_for(user_id)
                    .into_iter()
                    .filter(|m| m.measured_at >= cutoff)
                    .filter_map(|m| {
                        m.body_fat.map(|bf| BodyFatPoint {
                            date: m.measured_at.date_naive(),
                            body_fat: round2(bf),
                        })
                    })
                    .collect()
            },
        )
    }

    /// Best estimated 1RM per workout day for one exercise, chronological
    pub fn exercise_one_rm_progress(
        &mut self,
        user_id: Uuid,
        exercise_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<OneRmPoint>> {
        let store = self.store;
        self.cache.remember(
            &keys::one_rm_progress(user_id, exercise_id, days),
            self.stats_ttl,
            now,
            || compute_one_rm_progress(store, user_id, exercise_id, days, now),
        )
    }

    /// Volume per exercise category in the window
    pub fn muscle_distribution(
        &mut self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<MuscleVolume>> {
        let store = self.store;
        self.cache.remember(
            &keys::muscle_distribution(user_id, days),
            self.stats_ttl,
            now,
            || compute_muscle_distribution(store, user_id, days, now),
        )
    }

    /// The dashboard snapshot
    pub fn dashboard(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<DashboardData> {
        let store = self.store;
        self.cache
            .remember(&keys::dashboard(user_id), self.dashboard_ttl, now, || {
                compute_dashboard(store, user_id, now)
            })
    }
}

// ============================================================================
// Computation helpers (pure reads over the store)
// ============================================================================

/// Monday of the week containing `date`
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// First day of the month containing `date`
fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 always valid")
}

/// Sum of counted set volume over workouts whose day falls in
/// `[start, end]` (inclusive)
fn period_volume(store: &Store, user_id: Uuid, start: NaiveDate, end: NaiveDate) -> f64 {
    store
        .workouts_for(user_id)
        .filter(|w| {
            let day = w.day();
            day >= start && day <= end
        })
        .map(Workout::volume)
        .sum()
}

/// Period-over-period change. Percentage is exactly 100.0 when the
/// previous period had no volume and the current one does, and 0.0 when
/// both are empty.
fn comparison(current: f64, previous: f64) -> (f64, f64, f64, f64) {
    let difference = current - previous;
    let percentage = if previous > 0.0 {
        difference / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    };

    (
        round2(current),
        round2(previous),
        round2(difference),
        round2(percentage),
    )
}

fn compute_weekly_comparison(
    store: &Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> WeeklyVolumeComparison {
    let today = now.date_naive();
    let this_monday = week_start(today);
    let prev_monday = this_monday - Duration::days(7);
    let prev_sunday = this_monday - Duration::days(1);

    let current = period_volume(store, user_id, this_monday, today);
    let previous = period_volume(store, user_id, prev_monday, prev_sunday);
    let (current_week_volume, previous_week_volume, difference, percentage) =
        comparison(current, previous);

    WeeklyVolumeComparison {
        current_week_volume,
        previous_week_volume,
        difference,
        percentage,
    }
}

fn compute_monthly_comparison(
    store: &Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> (f64, f64, f64, f64) {
    let today = now.date_naive();
    let this_month = month_start(today);
    let prev_month_end = this_month - Duration::days(1);
    let prev_month = month_start(prev_month_end);

    let current = period_volume(store, user_id, this_month, today);
    let previous = period_volume(store, user_id, prev_month, prev_month_end);
    comparison(current, previous)
}

fn compute_daily_volume_trend(
    store: &Store,
    user_id: Uuid,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DailyVolume> {
    let today = now.date_naive();
    let start = today - Duration::days(i64::from(days) - 1);

    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for workout in store.workouts_for(user_id) {
        let day = workout.day();
        if day >= start && day <= today {
            *by_day.entry(day).or_insert(0.0) += workout.volume();
        }
    }

    (0..days)
        .map(|i| {
            let date = start + Duration::days(i64::from(i));
            DailyVolume {
                date,
                volume: round2(by_day.get(&date).copied().unwrap_or(0.0)),
            }
        })
        .collect()
}

fn compute_weekly_volume_trend(
    store: &Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Vec<WeekdayVolume> {
    const LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    let monday = week_start(now.date_naive());
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for workout in store.workouts_for(user_id) {
        let day = workout.day();
        if day >= monday && day < monday + Duration::days(7) {
            *by_day.entry(day).or_insert(0.0) += workout.volume();
        }
    }

    LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let date = monday + Duration::days(i as i64);
            WeekdayVolume {
                date,
                day_label: (*label).to_string(),
                volume: round2(by_day.get(&date).copied().unwrap_or(0.0)),
            }
        })
        .collect()
}

fn workout_volume_item(workout: &Workout) -> WorkoutVolume {
    WorkoutVolume {
        date: workout.day(),
        name: workout.name.clone(),
        volume: round2(workout.volume()),
    }
}

/// Most recent `limit` completed workouts, returned oldest first
fn recent_completed(store: &Store, user_id: Uuid, limit: u32) -> Vec<&Workout> {
    let mut workouts: Vec<&Workout> = store.completed_workouts_for(user_id).collect();
    workouts.sort_by_key(|w| w.started_at);
    if workouts.len() > limit as usize {
        workouts.drain(..workouts.len() - limit as usize);
    }
    workouts
}

fn compute_monthly_volume_history(
    store: &Store,
    user_id: Uuid,
    months: u32,
    now: DateTime<Utc>,
) -> Vec<MonthlyVolume> {
    let mut month_firsts = Vec::with_capacity(months as usize);
    let mut cursor = month_start(now.date_naive());
    for _ in 0..months {
        month_firsts.push(cursor);
        cursor = month_start(cursor - Duration::days(1));
    }
    month_firsts.reverse();

    let mut by_month: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for workout in store.completed_workouts_for(user_id) {
        *by_month.entry(month_start(workout.day())).or_insert(0.0) += workout.volume();
    }

    month_firsts
        .into_iter()
        .map(|first| MonthlyVolume {
            month: format!("{:04}-{:02}", first.year(), first.month()),
            volume: round2(by_month.get(&first).copied().unwrap_or(0.0)),
        })
        .collect()
}

fn compute_duration_distribution(
    store: &Store,
    user_id: Uuid,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DurationBucket> {
    let cutoff = now - Duration::days(i64::from(days));
    let mut counts = [0u32; 4];

    for workout in store.completed_workouts_for(user_id) {
        if workout.started_at < cutoff {
            continue;
        }
        let minutes = workout.duration_minutes().unwrap_or(0);
        let bucket = match minutes {
            m if m < 30 => 0,
            m if m < 60 => 1,
            m if m < 90 => 2,
            _ => 3,
        };
        counts[bucket] += 1;
    }

    DURATION_BUCKETS
        .iter()
        .zip(counts)
        .map(|(label, count)| DurationBucket {
            label: (*label).to_string(),
            count,
        })
        .collect()
}

fn compute_one_rm_progress(
    store: &Store,
    user_id: Uuid,
    exercise_id: Uuid,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<OneRmPoint> {
    let cutoff = now - Duration::days(i64::from(days));
    let mut best_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for workout in store.workouts_for(user_id) {
        if workout.started_at < cutoff {
            continue;
        }
        for line in workout.lines.iter().filter(|l| l.exercise_id == exercise_id) {
            for set in line.sets.iter().filter(|s| s.counts()) {
                let e1rm = estimated_one_rep_max(set.weight, set.reps);
                let entry = best_by_day.entry(workout.day()).or_insert(0.0);
                if e1rm > *entry {
                    *entry = e1rm;
                }
            }
        }
    }

    best_by_day
        .into_iter()
        .map(|(date, e1rm)| OneRmPoint {
            date,
            one_rep_max: round2(e1rm),
        })
        .collect()
}

fn compute_muscle_distribution(
    store: &Store,
    user_id: Uuid,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<MuscleVolume> {
    let cutoff = now - Duration::days(i64::from(days));
    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();

    for workout in store.workouts_for(user_id) {
        if workout.started_at < cutoff {
            continue;
        }
        for line in &workout.lines {
            let category = store
                .exercises
                .get(&line.exercise_id)
                .map(|e| e.category.clone())
                .unwrap_or_else(|| "other".to_string());
            let volume: f64 = line
                .sets
                .iter()
                .filter(|s| s.counts())
                .map(|s| s.volume())
                .sum();
            if volume > 0.0 {
                *by_category.entry(category).or_insert(0.0) += volume;
            }
        }
    }

    by_category
        .into_iter()
        .map(|(category, volume)| MuscleVolume {
            category,
            volume: round2(volume),
        })
        .collect()
}

fn compute_dashboard(store: &Store, user_id: Uuid, now: DateTime<Utc>) -> DashboardData {
    let today = now.date_naive();
    let monday = week_start(today);

    let workouts_count = store.workouts_for(user_id).count() as u64;
    let this_week_count = store
        .workouts_for(user_id)
        .filter(|w| w.day() >= monday)
        .count() as u64;

    let mut recent: Vec<&Workout> = store.workouts_for(user_id).collect();
    recent.sort_by_key(|w| std::cmp::Reverse(w.started_at));
    let recent_workouts = recent
        .iter()
        .take(3)
        .map(|w| RecentWorkout {
            name: w.name.clone(),
            started_at: w.started_at,
            volume: round2(w.volume()),
        })
        .collect();

    let mut records: Vec<_> = store.records_for(user_id).collect();
    records.sort_by_key(|r| std::cmp::Reverse(r.achieved_at));
    let recent_records = records
        .iter()
        .take(2)
        .map(|r| RecentRecord {
            exercise_id: r.exercise_id,
            kind: r.kind.as_str().to_string(),
            value: r.value,
            achieved_at: r.achieved_at,
        })
        .collect();

    let latest_weight = store.measurements_for(user_id).last().map(|m| m.weight);

    DashboardData {
        workouts_count,
        this_week_count,
        latest_weight,
        recent_workouts,
        recent_records,
        weekly: compute_weekly_comparison(store, user_id, now),
    }
}
