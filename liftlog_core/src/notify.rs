//! Notification dispatch seam.
//!
//! The core's responsibility ends at invoking a [`Notifier`] with a fully
//! populated payload; transport (web push, database rows) belongs to the
//! host layer. Achievement notices always carry the database channel and
//! add push only when the user opted in; personal-record notices are only
//! dispatched at all when the `personal_record` preference is on.

use crate::{AchievementDef, PersonalRecord, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel for a notification
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Database,
    Push,
}

/// Payload for a new or improved personal record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersonalRecordNotice {
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub kind: String,
    pub value: f64,
    pub secondary_value: Option<f64>,
    pub achieved_at: DateTime<Utc>,
}

impl PersonalRecordNotice {
    pub fn from_record(record: &PersonalRecord) -> Self {
        Self {
            user_id: record.user_id,
            exercise_id: record.exercise_id,
            kind: record.kind.as_str().to_string(),
            value: record.value,
            secondary_value: record.secondary_value,
            achieved_at: record.achieved_at,
        }
    }
}

/// Payload for a newly unlocked achievement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AchievementNotice {
    pub user_id: Uuid,
    pub slug: String,
    pub name: String,
    pub icon: String,
    pub message: String,
    pub achieved_at: DateTime<Utc>,
}

impl AchievementNotice {
    pub fn from_def(user_id: Uuid, def: &AchievementDef, achieved_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            slug: def.slug.to_string(),
            name: def.name.to_string(),
            icon: def.icon.to_string(),
            message: format!("Achievement unlocked: {}.", def.name),
            achieved_at,
        }
    }
}

/// Outbound notification seam implemented by the host layer
pub trait Notifier {
    fn personal_record(&mut self, user: &User, notice: PersonalRecordNotice);

    fn achievement(&mut self, user: &User, notice: AchievementNotice, channels: &[Channel]);
}

/// Notifier that drops everything
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn personal_record(&mut self, _user: &User, _notice: PersonalRecordNotice) {}

    fn achievement(&mut self, _user: &User, _notice: AchievementNotice, _channels: &[Channel]) {}
}

/// Notifier that records every dispatch, for tests and the CLI
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub personal_records: Vec<PersonalRecordNotice>,
    pub achievements: Vec<(AchievementNotice, Vec<Channel>)>,
}

impl Notifier for RecordingNotifier {
    fn personal_record(&mut self, user: &User, notice: PersonalRecordNotice) {
        tracing::debug!("PR notification for {}: {}", user.name, notice.kind);
        self.personal_records.push(notice);
    }

    fn achievement(&mut self, user: &User, notice: AchievementNotice, channels: &[Channel]) {
        tracing::debug!(
            "Achievement notification for {}: {} via {:?}",
            user.name,
            notice.slug,
            channels
        );
        self.achievements.push((notice, channels.to_vec()));
    }
}
