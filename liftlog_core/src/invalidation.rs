//! Cache-invalidation policy.
//!
//! Each domain write maps to the minimal set of cache keys whose
//! underlying data changed. The policy is a declarative table from
//! changed-field sets to named dependency classes, so it can be audited
//! and tested in isolation from the write path. A cosmetic edit (workout
//! name, notes) must never evict volume or duration aggregates; a date
//! change must evict every time-windowed aggregate because bucket
//! membership itself changes.

use crate::cache::{keys, StatsCache};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Day windows the aggregate layer is known to use
pub const STAT_WINDOWS: [u32; 4] = [7, 30, 90, 365];
/// History limits the aggregate layer is known to use
pub const HISTORY_LIMITS: [u32; 2] = [20, 30];
/// Month windows for monthly rollups
pub const MONTH_WINDOWS: [u32; 2] = [6, 12];

/// Named groups of cache keys that share an upstream dependency
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyClass {
    /// Everything derived from set weight/reps sums
    VolumeAggregates,
    /// Everything derived from workout start/end times
    DurationAggregates,
    /// The dashboard snapshot (display-only rollup)
    Dashboard,
    /// Weight and body-fat histories
    BodyMetrics,
}

/// Which workout fields a save touched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkoutDiff {
    /// Set content changed: weight, reps, sets added or removed
    pub content: bool,
    pub started_at: bool,
    pub name: bool,
    pub notes: bool,
    pub ended_at: bool,
}

impl WorkoutDiff {
    pub fn content_only() -> Self {
        Self {
            content: true,
            ..Self::default()
        }
    }
}

/// One selectable workout field, used by the policy table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkoutField {
    Content,
    StartedAt,
    Name,
    Notes,
    EndedAt,
}

use DependencyClass::*;

/// The policy table: changed field -> dependency classes to evict.
///
/// `StartedAt` hits both volume and duration aggregates because the
/// workout moves between day/week/month buckets. `Name` and `Notes` are
/// cosmetic and only refresh the dashboard snapshot.
const WORKOUT_POLICY: &[(WorkoutField, &[DependencyClass])] = &[
    (WorkoutField::Content, &[VolumeAggregates, Dashboard]),
    (
        WorkoutField::StartedAt,
        &[VolumeAggregates, DurationAggregates, Dashboard],
    ),
    (WorkoutField::Name, &[Dashboard]),
    (WorkoutField::Notes, &[Dashboard]),
    (WorkoutField::EndedAt, &[DurationAggregates, Dashboard]),
];

/// Classes evicted for a workout save with the given field diff
pub fn classes_for_workout_diff(diff: &WorkoutDiff) -> BTreeSet<DependencyClass> {
    let mut changed = Vec::new();
    if diff.content {
        changed.push(WorkoutField::Content);
    }
    if diff.started_at {
        changed.push(WorkoutField::StartedAt);
    }
    if diff.name {
        changed.push(WorkoutField::Name);
    }
    if diff.notes {
        changed.push(WorkoutField::Notes);
    }
    if diff.ended_at {
        changed.push(WorkoutField::EndedAt);
    }

    WORKOUT_POLICY
        .iter()
        .filter(|(field, _)| changed.contains(field))
        .flat_map(|(_, classes)| classes.iter().copied())
        .collect()
}

/// Classes evicted when a workout is deleted outright
pub fn classes_for_workout_delete() -> BTreeSet<DependencyClass> {
    [VolumeAggregates, DurationAggregates, Dashboard]
        .into_iter()
        .collect()
}

/// Classes evicted for a body-measurement save or delete.
///
/// The dashboard snapshot carries the latest weight, so it goes too.
pub fn classes_for_measurement() -> BTreeSet<DependencyClass> {
    [BodyMetrics, Dashboard].into_iter().collect()
}

/// Concrete keys behind a dependency class, for one user.
///
/// Exercise-scoped 1RM progress keys are left to expire by TTL; they are
/// not enumerable here without an exercise list.
pub fn keys_for_class(class: DependencyClass, user_id: Uuid) -> Vec<String> {
    match class {
        VolumeAggregates => {
            let mut out = Vec::new();
            for days in STAT_WINDOWS {
                out.push(keys::volume_trend(user_id, days));
                out.push(keys::daily_volume(user_id, days));
                out.push(keys::muscle_distribution(user_id, days));
            }
            for limit in HISTORY_LIMITS {
                out.push(keys::volume_history(user_id, limit));
            }
            for months in MONTH_WINDOWS {
                out.push(keys::monthly_volume_history(user_id, months));
            }
            out.push(keys::weekly_volume(user_id));
            out.push(keys::weekly_volume_comparison(user_id));
            out.push(keys::monthly_volume_comparison(user_id));
            out
        }
        DurationAggregates => {
            let mut out = Vec::new();
            for limit in HISTORY_LIMITS {
                out.push(keys::duration_history(user_id, limit));
            }
            for days in STAT_WINDOWS {
                out.push(keys::duration_distribution(user_id, days));
            }
            out
        }
        Dashboard => vec![keys::dashboard(user_id)],
        BodyMetrics => {
            let mut out = Vec::new();
            for days in STAT_WINDOWS {
                out.push(keys::weight_history(user_id, days));
                out.push(keys::body_fat_history(user_id, days));
            }
            out
        }
    }
}

/// Evict every key in the given classes for one user
pub fn evict(cache: &mut StatsCache, user_id: Uuid, classes: &BTreeSet<DependencyClass>) {
    for class in classes {
        for key in keys_for_class(*class, user_id) {
            cache.forget(&key);
        }
    }
    tracing::debug!("Evicted {:?} for user {}", classes, user_id);
}
