//! Personal record evaluation.
//!
//! Given a single completed set, decides whether it improves any of the
//! three per-exercise record kinds and persists the improvement. A record
//! only ever moves up: the check and the write happen under one store
//! borrow, so concurrent evaluation of the same key cannot produce
//! duplicate rows, and replaying the same event is a no-op.

use crate::formulas::{estimated_one_rep_max, round2};
use crate::notify::{Notifier, PersonalRecordNotice};
use crate::{PersonalRecord, RecordKind, Result, Store};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Snapshot of the set being evaluated, resolved from the store
struct SetSnapshot {
    set_id: Uuid,
    workout_id: Uuid,
    exercise_id: Uuid,
    workout_user_id: Uuid,
    weight: f64,
    reps: u32,
    is_warmup: bool,
}

fn resolve_set(store: &Store, workout_id: Uuid, set_id: Uuid) -> Result<SetSnapshot> {
    let workout = store.workout(workout_id)?;
    for line in &workout.lines {
        if let Some(set) = line.sets.iter().find(|s| s.id == set_id) {
            return Ok(SetSnapshot {
                set_id,
                workout_id,
                exercise_id: line.exercise_id,
                workout_user_id: workout.user_id,
                weight: set.weight,
                reps: set.reps,
                is_warmup: set.is_warmup,
            });
        }
    }
    Err(crate::Error::Store(format!(
        "set {} not found in workout {}",
        set_id, workout_id
    )))
}

/// Candidate value and secondary value for one record kind
fn candidate(kind: RecordKind, weight: f64, reps: u32) -> (f64, Option<f64>) {
    match kind {
        RecordKind::MaxWeight => (weight, Some(f64::from(reps))),
        RecordKind::MaxOneRm => (round2(estimated_one_rep_max(weight, reps)), Some(weight)),
        RecordKind::MaxVolumeSet => (weight * f64::from(reps), None),
    }
}

/// Evaluate a set against all record kinds and persist any improvements.
///
/// Warmup sets and sets with zero weight or zero reps create and update
/// nothing. The acting user is resolved from the set's workout unless
/// `user_override` is given (used when a set is moved between workouts).
/// Returns the records that were created or improved.
pub fn sync_set_prs<N: Notifier>(
    store: &mut Store,
    notifier: &mut N,
    workout_id: Uuid,
    set_id: Uuid,
    user_override: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Vec<PersonalRecord>> {
    let snapshot = resolve_set(store, workout_id, set_id)?;

    // Non-working sets leave no trace
    if snapshot.is_warmup || snapshot.weight <= 0.0 || snapshot.reps == 0 {
        return Ok(Vec::new());
    }

    let user_id = user_override.unwrap_or(snapshot.workout_user_id);
    let mut improved = Vec::new();

    for kind in RecordKind::ALL {
        let (value, secondary_value) = candidate(kind, snapshot.weight, snapshot.reps);

        match store.record_mut(user_id, snapshot.exercise_id, kind) {
            Some(existing) => {
                if value > existing.value {
                    existing.value = value;
                    existing.secondary_value = secondary_value;
                    existing.workout_id = snapshot.workout_id;
                    existing.set_id = snapshot.set_id;
                    existing.achieved_at = now;
                    improved.push(existing.clone());
                }
            }
            None => {
                let record = PersonalRecord {
                    user_id,
                    exercise_id: snapshot.exercise_id,
                    kind,
                    value,
                    secondary_value,
                    workout_id: snapshot.workout_id,
                    set_id: snapshot.set_id,
                    achieved_at: now,
                };
                store.records.push(record.clone());
                improved.push(record);
            }
        }
    }

    if !improved.is_empty() {
        tracing::info!(
            "User {} improved {} record(s) on exercise {}",
            user_id,
            improved.len(),
            snapshot.exercise_id
        );

        let user = store.user(user_id)?;
        if user.notification_prefs.personal_record {
            for record in &improved {
                notifier.personal_record(user, PersonalRecordNotice::from_record(record));
            }
        }
    }

    Ok(improved)
}
