//! In-memory domain store with atomic file persistence.
//!
//! The store stands in for the host application's ORM: it owns users,
//! exercises, workouts, measurements, personal records and achievement
//! grants, and provides the user-scoped query helpers the services need.
//! Every query is keyed by `user_id` so one user's aggregates can never
//! observe another user's rows.
//!
//! Persistence (for the CLI host) is an atomic JSON snapshot with file
//! locking: write to a temp file, sync, rename over the original.

use crate::{
    BodyMeasurement, Error, Exercise, PersonalRecord, RecordKind, Result, User, UserAchievement,
    Workout,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// The complete domain state for all users
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Store {
    pub users: HashMap<Uuid, User>,
    pub exercises: HashMap<Uuid, Exercise>,
    pub workouts: Vec<Workout>,
    pub measurements: Vec<BodyMeasurement>,
    pub records: Vec<PersonalRecord>,
    pub user_achievements: Vec<UserAchievement>,
}

impl Store {
    pub fn user(&self, user_id: Uuid) -> Result<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| Error::Store(format!("unknown user {}", user_id)))
    }

    pub fn user_mut(&mut self, user_id: Uuid) -> Result<&mut User> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| Error::Store(format!("unknown user {}", user_id)))
    }

    pub fn workout(&self, workout_id: Uuid) -> Result<&Workout> {
        self.workouts
            .iter()
            .find(|w| w.id == workout_id)
            .ok_or_else(|| Error::Store(format!("unknown workout {}", workout_id)))
    }

    pub fn workout_mut(&mut self, workout_id: Uuid) -> Result<&mut Workout> {
        self.workouts
            .iter_mut()
            .find(|w| w.id == workout_id)
            .ok_or_else(|| Error::Store(format!("unknown workout {}", workout_id)))
    }

    /// All workouts belonging to a user, in insertion order
    pub fn workouts_for(&self, user_id: Uuid) -> impl Iterator<Item = &Workout> {
        self.workouts.iter().filter(move |w| w.user_id == user_id)
    }

    /// Completed workouts only (in-progress sessions excluded)
    pub fn completed_workouts_for(&self, user_id: Uuid) -> impl Iterator<Item = &Workout> {
        self.workouts_for(user_id).filter(|w| w.ended_at.is_some())
    }

    /// A user's measurements sorted by `measured_at`, oldest first
    pub fn measurements_for(&self, user_id: Uuid) -> Vec<&BodyMeasurement> {
        let mut out: Vec<_> = self
            .measurements
            .iter()
            .filter(|m| m.user_id == user_id)
            .collect();
        out.sort_by_key(|m| m.measured_at);
        out
    }

    pub fn records_for(&self, user_id: Uuid) -> impl Iterator<Item = &PersonalRecord> {
        self.records.iter().filter(move |r| r.user_id == user_id)
    }

    pub(crate) fn record_mut(
        &mut self,
        user_id: Uuid,
        exercise_id: Uuid,
        kind: RecordKind,
    ) -> Option<&mut PersonalRecord> {
        self.records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.exercise_id == exercise_id && r.kind == kind)
    }

    pub fn has_achievement(&self, user_id: Uuid, slug: &str) -> bool {
        self.user_achievements
            .iter()
            .any(|a| a.user_id == user_id && a.slug == slug)
    }

    /// Total volume over a user's counted sets, all time
    pub fn total_volume(&self, user_id: Uuid) -> f64 {
        self.workouts_for(user_id).map(Workout::volume).sum()
    }

    /// Load a store snapshot with shared locking.
    ///
    /// Returns an empty store if the file doesn't exist. A corrupted
    /// snapshot logs a warning and yields the default, mirroring how the
    /// rest of the system treats unreadable local state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No store file found, starting empty");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open store {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock store {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read store {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Store>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded store from {:?}", path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse store {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the store with exclusive locking.
    ///
    /// Atomically writes the snapshot by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gender, SetEntry, WorkoutLine};
    use chrono::Utc;

    fn seeded_store() -> (Store, Uuid) {
        let mut store = Store::default();
        let user = User::new("Alex", Gender::Male);
        let user_id = user.id;
        store.users.insert(user_id, user);

        let exercise = Exercise::new("Back Squat", "legs");
        let exercise_id = exercise.id;
        store.exercises.insert(exercise_id, exercise);

        let mut workout = Workout::new(user_id, "Leg Day", Utc::now());
        let mut line = WorkoutLine::new(exercise_id);
        line.sets.push(SetEntry::new(100.0, 5, 0));
        workout.lines.push(line);
        workout.ended_at = Some(Utc::now());
        store.workouts.push(workout);

        (store, user_id)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store_path = temp_dir.path().join("store.json");

        let (store, user_id) = seeded_store();
        store.save(&store_path).unwrap();

        let loaded = Store::load(&store_path).unwrap();
        assert!(loaded.users.contains_key(&user_id));
        assert_eq!(loaded.workouts.len(), 1);
        assert_eq!(loaded.total_volume(user_id), 500.0);
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(store.users.is_empty());
    }

    #[test]
    fn test_corrupted_store_starts_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store_path = temp_dir.path().join("store.json");
        std::fs::write(&store_path, "{ invalid json }").unwrap();

        let store = Store::load(&store_path).unwrap();
        assert!(store.users.is_empty());
    }

    #[test]
    fn test_queries_are_user_scoped() {
        let (mut store, user_id) = seeded_store();

        let other = User::new("Sam", Gender::Female);
        let other_id = other.id;
        store.users.insert(other_id, other);

        assert_eq!(store.workouts_for(user_id).count(), 1);
        assert_eq!(store.workouts_for(other_id).count(), 0);
        assert_eq!(store.total_volume(other_id), 0.0);
    }

    #[test]
    fn test_completed_filter_excludes_in_progress() {
        let (mut store, user_id) = seeded_store();
        store
            .workouts
            .push(Workout::new(user_id, "In Progress", Utc::now()));

        assert_eq!(store.workouts_for(user_id).count(), 2);
        assert_eq!(store.completed_workouts_for(user_id).count(), 1);
    }
}
