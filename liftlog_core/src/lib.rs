#![forbid(unsafe_code)]

//! Core domain model and business logic for the Liftlog analytics engine.
//!
//! This crate provides:
//! - Domain types (users, workouts, sets, measurements, records)
//! - Strength and nutrition formulas
//! - Personal record, achievement and streak evaluation
//! - Time-windowed stats aggregates with a TTL cache
//! - Cache-invalidation policy and the event-driven engine
//! - Persistence (JSON store snapshot, CSV export)

pub mod types;
pub mod error;
pub mod formulas;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod cache;
pub mod invalidation;
pub mod stats;
pub mod records;
pub mod streaks;
pub mod achievements;
pub mod notify;
pub mod engine;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{achievement_by_slug, achievement_catalog};
pub use config::Config;
pub use store::Store;
pub use cache::StatsCache;
pub use invalidation::WorkoutDiff;
pub use stats::StatsService;
pub use records::sync_set_prs;
pub use streaks::{effective_current_streak, update_streak};
pub use achievements::sync_achievements;
pub use notify::{NullNotifier, Notifier, RecordingNotifier};
pub use engine::{DomainEvent, Engine};
pub use export::export_workout_history;
