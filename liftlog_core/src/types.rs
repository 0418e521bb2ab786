//! Core domain types for the Liftlog analytics engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Users, workouts, workout lines and sets
//! - Body measurements
//! - Personal records and their kinds
//! - Achievement definitions and grants
//! - Streak counters

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// User Types
// ============================================================================

/// Gender, as used by the Wilks and macro formulas
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Per-user push notification preferences
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub personal_record: bool,
    pub achievements: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            personal_record: true,
            achievements: true,
        }
    }
}

/// Rolling consecutive-day workout counters.
///
/// Fields are private on purpose: the only writer is the streak service
/// (via the crate-internal [`StreakCounters::apply`]), so unrelated edits
/// can never drift these values.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StreakCounters {
    current_streak: u32,
    longest_streak: u32,
    last_workout_at: Option<DateTime<Utc>>,
}

impl StreakCounters {
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    pub fn last_workout_at(&self) -> Option<DateTime<Utc>> {
        self.last_workout_at
    }

    /// Overwrite the counters. Only callable from inside the crate;
    /// the sole call site is the streak service.
    pub(crate) fn apply(
        &mut self,
        current_streak: u32,
        longest_streak: u32,
        last_workout_at: Option<DateTime<Utc>>,
    ) {
        self.current_streak = current_streak;
        self.longest_streak = longest_streak;
        self.last_workout_at = last_workout_at;
    }
}

/// An application user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub gender: Gender,
    #[serde(default)]
    pub notification_prefs: NotificationPrefs,
    #[serde(default)]
    pub streak: StreakCounters,
}

impl User {
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            gender,
            notification_prefs: NotificationPrefs::default(),
            streak: StreakCounters::default(),
        }
    }
}

// ============================================================================
// Exercise and Workout Types
// ============================================================================

/// An exercise definition (e.g., "Back Squat")
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    /// Muscle group, used by the muscle-distribution aggregate
    pub category: String,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
        }
    }
}

/// A single set within a workout line
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetEntry {
    pub id: Uuid,
    pub weight: f64,
    pub reps: u32,
    pub is_warmup: bool,
    pub is_completed: bool,
    pub order: u32,
}

impl SetEntry {
    pub fn new(weight: f64, reps: u32, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            weight,
            reps,
            is_warmup: false,
            is_completed: true,
            order,
        }
    }

    /// Single-set volume: weight x reps
    pub fn volume(&self) -> f64 {
        self.weight * f64::from(self.reps)
    }

    /// Whether this set counts toward volume, PRs and achievements.
    ///
    /// Warmup sets never count; neither do sets that were not completed.
    pub fn counts(&self) -> bool {
        self.is_completed && !self.is_warmup
    }
}

/// One exercise within a workout, owning an ordered sequence of sets
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutLine {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub sets: Vec<SetEntry>,
}

impl WorkoutLine {
    pub fn new(exercise_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise_id,
            sets: Vec::new(),
        }
    }
}

/// A workout session. `ended_at == None` means still in progress.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub lines: Vec<WorkoutLine>,
}

impl Workout {
    pub fn new(user_id: Uuid, name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            notes: None,
            started_at,
            ended_at: None,
            lines: Vec::new(),
        }
    }

    /// Total volume over all counted sets
    pub fn volume(&self) -> f64 {
        self.lines
            .iter()
            .flat_map(|line| line.sets.iter())
            .filter(|set| set.counts())
            .map(SetEntry::volume)
            .sum()
    }

    /// Duration in whole minutes; undefined while in progress
    pub fn duration_minutes(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_minutes())
    }

    /// The calendar day this workout belongs to
    pub fn day(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

// ============================================================================
// Body Measurement Types
// ============================================================================

/// A body measurement snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight: f64,
    pub body_fat: Option<f64>,
    pub measured_at: DateTime<Utc>,
}

impl BodyMeasurement {
    pub fn new(user_id: Uuid, weight: f64, measured_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            weight,
            body_fat: None,
            measured_at,
        }
    }
}

// ============================================================================
// Personal Record Types
// ============================================================================

/// The three tracked record kinds for a (user, exercise) pair
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    MaxWeight,
    MaxOneRm,
    MaxVolumeSet,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::MaxWeight,
        RecordKind::MaxOneRm,
        RecordKind::MaxVolumeSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::MaxWeight => "max_weight",
            RecordKind::MaxOneRm => "max_1rm",
            RecordKind::MaxVolumeSet => "max_volume_set",
        }
    }
}

/// A personal record. At most one exists per (user, exercise, kind),
/// and its value only ever increases.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub kind: RecordKind,
    pub value: f64,
    pub secondary_value: Option<f64>,
    pub workout_id: Uuid,
    pub set_id: Uuid,
    pub achieved_at: DateTime<Utc>,
}

// ============================================================================
// Achievement Types
// ============================================================================

/// The closed set of achievement kinds.
///
/// Each kind knows how to evaluate itself against pre-computed user
/// metrics, so adding a kind is a compile-time-checked extension.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    /// Total number of workouts
    Count,
    /// Heaviest single working set
    WeightRecord,
    /// Lifetime volume across all working sets
    VolumeTotal,
    /// Consecutive workout days
    Streak,
}

/// A static achievement definition from the built-in catalog
#[derive(Clone, Debug)]
pub struct AchievementDef {
    pub slug: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub kind: AchievementKind,
    pub threshold: f64,
    pub category: &'static str,
}

/// A granted achievement. Created at most once per (user, slug).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: Uuid,
    pub slug: String,
    pub achieved_at: DateTime<Utc>,
}
