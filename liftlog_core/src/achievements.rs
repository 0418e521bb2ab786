//! Achievement evaluation and granting.
//!
//! Re-evaluates the whole catalog against a user's aggregate history and
//! grants newly met definitions exactly once. Granting never revokes:
//! once a slug is attached it stays attached even if the underlying
//! numbers later regress. Safe to run repeatedly, including from retried
//! background jobs.

use crate::catalog::achievement_catalog;
use crate::notify::{AchievementNotice, Channel, Notifier};
use crate::{AchievementDef, AchievementKind, Result, Store, UserAchievement, Workout};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Aggregate metrics computed once per evaluation run, from the given
/// user's data only
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserMetrics {
    pub workout_count: u64,
    pub max_set_weight: f64,
    pub total_volume: f64,
    pub trailing_streak_days: u32,
}

/// Compute the metrics backing every achievement kind
pub fn compute_metrics(store: &Store, user_id: Uuid) -> UserMetrics {
    let workout_count = store.workouts_for(user_id).count() as u64;

    let max_set_weight = store
        .workouts_for(user_id)
        .flat_map(|w| w.lines.iter())
        .flat_map(|l| l.sets.iter())
        .filter(|s| s.counts())
        .map(|s| s.weight)
        .fold(0.0_f64, f64::max);

    let total_volume = store.total_volume(user_id);

    UserMetrics {
        workout_count,
        max_set_weight,
        total_volume,
        trailing_streak_days: trailing_streak_days(store.workouts_for(user_id)),
    }
}

/// Consecutive calendar days with at least one workout, counted backwards
/// from the most recent workout day
fn trailing_streak_days<'a>(workouts: impl Iterator<Item = &'a Workout>) -> u32 {
    let mut days: Vec<NaiveDate> = workouts.map(Workout::day).collect();
    days.sort_unstable();
    days.dedup();

    let mut streak = 0;
    let mut expected: Option<NaiveDate> = None;

    for day in days.into_iter().rev() {
        match expected {
            None => streak = 1,
            Some(e) if day == e => streak += 1,
            Some(_) => break,
        }
        expected = day.pred_opt();
    }

    streak
}

impl AchievementKind {
    /// Whether this kind's metric meets the threshold
    pub fn is_met(&self, metrics: &UserMetrics, threshold: f64) -> bool {
        match self {
            AchievementKind::Count => metrics.workout_count as f64 >= threshold,
            AchievementKind::WeightRecord => metrics.max_set_weight >= threshold,
            AchievementKind::VolumeTotal => metrics.total_volume >= threshold,
            AchievementKind::Streak => f64::from(metrics.trailing_streak_days) >= threshold,
        }
    }
}

/// Re-evaluate every catalog definition for a user and grant any newly
/// met ones.
///
/// Idempotent: a slug the user already holds is skipped without
/// re-notifying. Returns the definitions granted by this run.
pub fn sync_achievements<N: Notifier>(
    store: &mut Store,
    notifier: &mut N,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<&'static AchievementDef>> {
    // Validate the user up front so a bad id cannot half-grant
    store.user(user_id)?;

    let locked: Vec<&'static AchievementDef> = achievement_catalog()
        .iter()
        .filter(|def| !store.has_achievement(user_id, def.slug))
        .collect();

    if locked.is_empty() {
        return Ok(Vec::new());
    }

    let metrics = compute_metrics(store, user_id);
    let mut granted = Vec::new();

    for def in locked {
        if !def.kind.is_met(&metrics, def.threshold) {
            continue;
        }

        store.user_achievements.push(UserAchievement {
            user_id,
            slug: def.slug.to_string(),
            achieved_at: now,
        });
        granted.push(def);
    }

    if !granted.is_empty() {
        let user = store.user(user_id)?;
        let mut channels = vec![Channel::Database];
        if user.notification_prefs.achievements {
            channels.push(Channel::Push);
        }

        for def in &granted {
            tracing::info!("User {} unlocked achievement {}", user_id, def.slug);
            notifier.achievement(
                user,
                AchievementNotice::from_def(user_id, def, now),
                &channels,
            );
        }
    }

    Ok(granted)
}
