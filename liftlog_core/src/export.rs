//! CSV export of a user's workout history.
//!
//! One row per set, chronological by workout start. The file is synced to
//! disk before the function returns so a crash right after an export
//! cannot leave a half-written file behind.

use crate::{Result, Store};
use std::path::Path;
use uuid::Uuid;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    workout_id: String,
    workout_name: String,
    started_at: String,
    ended_at: Option<String>,
    exercise: String,
    set_order: u32,
    weight: f64,
    reps: u32,
    is_warmup: bool,
    is_completed: bool,
    volume: f64,
}

/// Write a user's complete workout history to `csv_path`.
///
/// Warmup and incomplete sets are included, flagged by their columns;
/// filtering is the consumer's call. Returns the number of rows written.
pub fn export_workout_history(store: &Store, user_id: Uuid, csv_path: &Path) -> Result<usize> {
    store.user(user_id)?;

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut workouts: Vec<_> = store.workouts_for(user_id).collect();
    workouts.sort_by_key(|w| w.started_at);

    let file = std::fs::File::create(csv_path)?;
    let mut writer = csv::Writer::from_writer(file);
    let mut rows = 0;

    for workout in workouts {
        for line in &workout.lines {
            let exercise = store
                .exercises
                .get(&line.exercise_id)
                .map(|e| e.name.as_str())
                .unwrap_or("unknown");

            for set in &line.sets {
                writer.serialize(CsvRow {
                    workout_id: workout.id.to_string(),
                    workout_name: workout.name.clone(),
                    started_at: workout.started_at.to_rfc3339(),
                    ended_at: workout.ended_at.map(|t| t.to_rfc3339()),
                    exercise: exercise.to_string(),
                    set_order: set.order,
                    weight: set.weight,
                    reps: set.reps,
                    is_warmup: set.is_warmup,
                    is_completed: set.is_completed,
                    volume: set.volume(),
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} set rows for user {}", rows, user_id);
    Ok(rows)
}
