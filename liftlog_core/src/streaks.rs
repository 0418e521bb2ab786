//! Consecutive-day workout streak tracking.
//!
//! The counters on the user are written only here; everything else reads
//! them through getters. Display layers use [`effective_current_streak`]
//! for the lazy-decay view instead of mutating stored state.

use chrono::{DateTime, Utc};

use crate::User;

/// Update a user's streak counters for a workout started at `started_at`.
///
/// Day-granular rules:
/// - no prior workout: streak becomes 1
/// - exactly one calendar day after the last recorded day: increment
/// - same calendar day: counters unchanged
/// - anything else (gap of 2+ days): reset to 1
///
/// `last_workout_at` always advances to the later of the stored and new
/// timestamps; `longest_streak` tracks the running maximum. A backfilled
/// workout on an earlier day leaves the counters alone.
pub fn update_streak(user: &mut User, started_at: DateTime<Utc>) {
    let workout_day = started_at.date_naive();
    let last_at = user.streak.last_workout_at();
    let last_day = last_at.map(|at| at.date_naive());

    let mut current = user.streak.current_streak();

    match last_day {
        None => current = 1,
        Some(last) => {
            let gap = (workout_day - last).num_days();
            if gap == 1 {
                current += 1;
            } else if gap > 1 {
                current = 1;
            }
            // gap == 0: same day, no change; gap < 0: backfill, no change
        }
    }

    let longest = user.streak.longest_streak().max(current);
    let newest = match last_at {
        Some(last) if last >= started_at => last,
        _ => started_at,
    };

    user.streak.apply(current, longest, Some(newest));

    tracing::debug!(
        "Streak for {}: current={}, longest={}",
        user.name,
        current,
        longest
    );
}

/// The streak as it should be displayed right now.
///
/// If more than one calendar day has passed since the last workout the
/// streak is dead, but the stored counter is left untouched; this is a
/// read view, not a state mutation.
pub fn effective_current_streak(user: &User, now: DateTime<Utc>) -> u32 {
    match user.streak.last_workout_at() {
        None => 0,
        Some(last) => {
            let gap = (now.date_naive() - last.date_naive()).num_days();
            if gap > 1 {
                0
            } else {
                user.streak.current_streak()
            }
        }
    }
}
