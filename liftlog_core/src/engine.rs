//! Write-path orchestration.
//!
//! The engine owns the store, the stats cache and the notifier, and turns
//! domain events into the fixed sequence the rest of the crate relies on:
//! evaluate personal records and streaks synchronously, evict exactly the
//! cache keys the write invalidated, then queue one deduplicated
//! achievement sync per user for the next job run. Replaying an event is
//! harmless: records never move down, streaks are day-granular and
//! achievement grants are idempotent.

use crate::cache::StatsCache;
use crate::config::Config;
use crate::invalidation::{
    classes_for_measurement, classes_for_workout_delete, classes_for_workout_diff, evict,
    WorkoutDiff,
};
use crate::notify::Notifier;
use crate::stats::StatsService;
use crate::{achievements, records, streaks, AchievementDef, PersonalRecord, Result, Store};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A domain write the engine reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    /// A set was created or edited inside a workout
    SetSaved {
        workout_id: Uuid,
        set_id: Uuid,
        /// Attribute resulting records to this user instead of the
        /// workout's owner (set moved between workouts)
        user_override: Option<Uuid>,
    },
    /// A workout was created or edited; the diff says which fields moved
    WorkoutSaved { workout_id: Uuid, diff: WorkoutDiff },
    WorkoutDeleted { user_id: Uuid },
    MeasurementSaved { user_id: Uuid },
    MeasurementDeleted { user_id: Uuid },
    /// Explicit request to re-run achievement evaluation for a user
    SyncRequested { user_id: Uuid },
}

/// Deferred work, deduplicated per user until the next job run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SyncJob {
    Achievements(Uuid),
}

/// What a single event application did, for callers that display results
#[derive(Debug, Default)]
pub struct EventOutcome {
    pub improved_records: Vec<PersonalRecord>,
}

/// Orchestrates writes over the store, cache and notifier
pub struct Engine<N: Notifier> {
    store: Store,
    cache: StatsCache,
    notifier: N,
    config: Config,
    pending: BTreeSet<SyncJob>,
}

impl<N: Notifier> Engine<N> {
    pub fn new(store: Store, notifier: N, config: Config) -> Self {
        Self {
            store,
            cache: StatsCache::new(),
            notifier,
            config,
            pending: BTreeSet::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Direct store access for the host's own writes. The caller is
    /// responsible for following up with the matching [`DomainEvent`].
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_parts(self) -> (Store, N) {
        (self.store, self.notifier)
    }

    /// The read side, sharing this engine's cache
    pub fn stats(&mut self) -> StatsService<'_> {
        StatsService::new(&self.store, &mut self.cache, &self.config.cache)
    }

    /// Apply one domain event: synchronous record/streak upkeep, cache
    /// eviction per the invalidation policy, and deferred achievement
    /// evaluation.
    pub fn handle(&mut self, event: DomainEvent, now: DateTime<Utc>) -> Result<EventOutcome> {
        tracing::debug!("Handling {:?}", event);
        let mut outcome = EventOutcome::default();

        match event {
            DomainEvent::SetSaved {
                workout_id,
                set_id,
                user_override,
            } => {
                let owner = self.store.workout(workout_id)?.user_id;
                let user_id = user_override.unwrap_or(owner);

                outcome.improved_records = records::sync_set_prs(
                    &mut self.store,
                    &mut self.notifier,
                    workout_id,
                    set_id,
                    user_override,
                    now,
                )?;

                evict(
                    &mut self.cache,
                    user_id,
                    &classes_for_workout_diff(&WorkoutDiff::content_only()),
                );
                self.pending.insert(SyncJob::Achievements(user_id));
            }

            DomainEvent::WorkoutSaved { workout_id, diff } => {
                let workout = self.store.workout(workout_id)?;
                let user_id = workout.user_id;
                let started_at = workout.started_at;

                if diff.started_at {
                    streaks::update_streak(self.store.user_mut(user_id)?, started_at);
                }

                evict(&mut self.cache, user_id, &classes_for_workout_diff(&diff));

                if diff.content || diff.started_at {
                    self.pending.insert(SyncJob::Achievements(user_id));
                }
            }

            DomainEvent::WorkoutDeleted { user_id } => {
                evict(&mut self.cache, user_id, &classes_for_workout_delete());
            }

            DomainEvent::MeasurementSaved { user_id }
            | DomainEvent::MeasurementDeleted { user_id } => {
                evict(&mut self.cache, user_id, &classes_for_measurement());
            }

            DomainEvent::SyncRequested { user_id } => {
                self.pending.insert(SyncJob::Achievements(user_id));
            }
        }

        Ok(outcome)
    }

    /// Number of queued jobs waiting for [`Engine::run_pending_jobs`]
    pub fn pending_job_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain the job queue. Returns every achievement granted this run.
    pub fn run_pending_jobs(&mut self, now: DateTime<Utc>) -> Result<Vec<&'static AchievementDef>> {
        let jobs = std::mem::take(&mut self.pending);
        let mut granted = Vec::new();

        for job in jobs {
            match job {
                SyncJob::Achievements(user_id) => {
                    granted.extend(achievements::sync_achievements(
                        &mut self.store,
                        &mut self.notifier,
                        user_id,
                        now,
                    )?);
                }
            }
        }

        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;
    use crate::notify::RecordingNotifier;
    use crate::{Exercise, Gender, SetEntry, User, Workout, WorkoutLine};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        engine: Engine<RecordingNotifier>,
        user_id: Uuid,
        exercise_id: Uuid,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 19, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let mut store = Store::default();
        let user = User::new("Alex", Gender::Male);
        let user_id = user.id;
        store.users.insert(user_id, user);

        let exercise = Exercise::new("Bench Press", "chest");
        let exercise_id = exercise.id;
        store.exercises.insert(exercise_id, exercise);

        Fixture {
            engine: Engine::new(store, RecordingNotifier::default(), Config::default()),
            user_id,
            exercise_id,
        }
    }

    /// Insert a completed workout with one working set, return ids
    fn seed_workout(fx: &mut Fixture, weight: f64, reps: u32) -> (Uuid, Uuid) {
        let started = now() - Duration::hours(1);
        let mut workout = Workout::new(fx.user_id, "Push Day", started);
        let mut line = WorkoutLine::new(fx.exercise_id);
        let set = SetEntry::new(weight, reps, 0);
        let set_id = set.id;
        line.sets.push(set);
        workout.lines.push(line);
        workout.ended_at = Some(now());
        let workout_id = workout.id;
        fx.engine.store_mut().workouts.push(workout);
        (workout_id, set_id)
    }

    #[test]
    fn test_set_saved_creates_records_and_queues_achievements() {
        let mut fx = fixture();
        let (workout_id, set_id) = seed_workout(&mut fx, 100.0, 5);

        let outcome = fx
            .engine
            .handle(
                DomainEvent::SetSaved {
                    workout_id,
                    set_id,
                    user_override: None,
                },
                now(),
            )
            .unwrap();

        assert_eq!(outcome.improved_records.len(), 3);
        assert_eq!(fx.engine.pending_job_count(), 1);

        let granted = fx.engine.run_pending_jobs(now()).unwrap();
        assert!(granted.iter().any(|d| d.slug == "first-workout"));
        assert_eq!(fx.engine.pending_job_count(), 0);
    }

    #[test]
    fn test_duplicate_events_queue_one_job_and_grant_once() {
        let mut fx = fixture();
        let (workout_id, set_id) = seed_workout(&mut fx, 100.0, 5);
        let event = DomainEvent::SetSaved {
            workout_id,
            set_id,
            user_override: None,
        };

        fx.engine.handle(event, now()).unwrap();
        fx.engine.handle(event, now()).unwrap();
        assert_eq!(fx.engine.pending_job_count(), 1);

        fx.engine.run_pending_jobs(now()).unwrap();
        let grants = fx
            .engine
            .store()
            .user_achievements
            .iter()
            .filter(|a| a.slug == "first-workout")
            .count();
        assert_eq!(grants, 1);
    }

    #[test]
    fn test_replayed_set_event_improves_nothing() {
        let mut fx = fixture();
        let (workout_id, set_id) = seed_workout(&mut fx, 100.0, 5);
        let event = DomainEvent::SetSaved {
            workout_id,
            set_id,
            user_override: None,
        };

        let first = fx.engine.handle(event, now()).unwrap();
        let second = fx.engine.handle(event, now()).unwrap();

        assert_eq!(first.improved_records.len(), 3);
        assert!(second.improved_records.is_empty());
        assert_eq!(fx.engine.store().records.len(), 3);
    }

    #[test]
    fn test_workout_saved_with_new_date_updates_streak() {
        let mut fx = fixture();
        let (workout_id, _) = seed_workout(&mut fx, 100.0, 5);

        fx.engine
            .handle(
                DomainEvent::WorkoutSaved {
                    workout_id,
                    diff: WorkoutDiff {
                        content: true,
                        started_at: true,
                        ..WorkoutDiff::default()
                    },
                },
                now(),
            )
            .unwrap();

        let user = fx.engine.store().user(fx.user_id).unwrap();
        assert_eq!(user.streak.current_streak(), 1);
        assert!(user.streak.last_workout_at().is_some());
    }

    #[test]
    fn test_cosmetic_save_keeps_volume_cache_and_queues_nothing() {
        let mut fx = fixture();
        let (workout_id, _) = seed_workout(&mut fx, 100.0, 5);

        // Warm the caches
        let volume = fx
            .engine
            .stats()
            .volume_history(fx.user_id, 20, now())
            .unwrap();
        assert_eq!(volume[0].volume, 500.0);
        fx.engine.stats().dashboard(fx.user_id, now()).unwrap();
        assert!(fx
            .engine
            .cache
            .contains(&keys::volume_history(fx.user_id, 20), now()));

        fx.engine
            .handle(
                DomainEvent::WorkoutSaved {
                    workout_id,
                    diff: WorkoutDiff {
                        name: true,
                        ..WorkoutDiff::default()
                    },
                },
                now(),
            )
            .unwrap();

        assert!(fx
            .engine
            .cache
            .contains(&keys::volume_history(fx.user_id, 20), now()));
        assert!(!fx.engine.cache.contains(&keys::dashboard(fx.user_id), now()));
        assert_eq!(fx.engine.pending_job_count(), 0);
    }

    #[test]
    fn test_set_saved_evicts_volume_aggregates() {
        let mut fx = fixture();
        let (workout_id, set_id) = seed_workout(&mut fx, 100.0, 5);

        fx.engine
            .stats()
            .volume_history(fx.user_id, 20, now())
            .unwrap();
        assert!(fx
            .engine
            .cache
            .contains(&keys::volume_history(fx.user_id, 20), now()));

        fx.engine
            .handle(
                DomainEvent::SetSaved {
                    workout_id,
                    set_id,
                    user_override: None,
                },
                now(),
            )
            .unwrap();

        assert!(!fx
            .engine
            .cache
            .contains(&keys::volume_history(fx.user_id, 20), now()));
    }

    #[test]
    fn test_measurement_event_evicts_body_metrics_only() {
        let mut fx = fixture();
        seed_workout(&mut fx, 100.0, 5);

        fx.engine
            .stats()
            .volume_history(fx.user_id, 20, now())
            .unwrap();
        fx.engine
            .stats()
            .weight_history(fx.user_id, 30, now())
            .unwrap();

        fx.engine
            .handle(DomainEvent::MeasurementSaved { user_id: fx.user_id }, now())
            .unwrap();

        assert!(fx
            .engine
            .cache
            .contains(&keys::volume_history(fx.user_id, 20), now()));
        assert!(!fx
            .engine
            .cache
            .contains(&keys::weight_history(fx.user_id, 30), now()));
    }

    #[test]
    fn test_workout_delete_evicts_volume_and_duration() {
        let mut fx = fixture();
        seed_workout(&mut fx, 100.0, 5);

        fx.engine
            .stats()
            .duration_history(fx.user_id, 20, now())
            .unwrap();
        fx.engine
            .stats()
            .volume_history(fx.user_id, 20, now())
            .unwrap();

        fx.engine
            .handle(DomainEvent::WorkoutDeleted { user_id: fx.user_id }, now())
            .unwrap();

        assert!(!fx
            .engine
            .cache
            .contains(&keys::duration_history(fx.user_id, 20), now()));
        assert!(!fx
            .engine
            .cache
            .contains(&keys::volume_history(fx.user_id, 20), now()));
    }

    #[test]
    fn test_sync_requested_runs_achievements() {
        let mut fx = fixture();
        seed_workout(&mut fx, 100.0, 5);

        fx.engine
            .handle(DomainEvent::SyncRequested { user_id: fx.user_id }, now())
            .unwrap();
        let granted = fx.engine.run_pending_jobs(now()).unwrap();

        assert!(granted.iter().any(|d| d.slug == "first-workout"));
    }

    #[test]
    fn test_unknown_workout_is_an_error() {
        let mut fx = fixture();
        let result = fx.engine.handle(
            DomainEvent::SetSaved {
                workout_id: Uuid::new_v4(),
                set_id: Uuid::new_v4(),
                user_override: None,
            },
            now(),
        );
        assert!(result.is_err());
    }
}
