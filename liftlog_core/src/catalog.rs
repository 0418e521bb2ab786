//! Built-in achievement catalog.
//!
//! Definitions are static: re-seeding or re-evaluating never duplicates a
//! grant because granting is keyed by slug.

use crate::{AchievementDef, AchievementKind};
use once_cell::sync::Lazy;

/// Cached catalog - built once and reused across all evaluations
static CATALOG: Lazy<Vec<AchievementDef>> = Lazy::new(build_achievement_catalog);

/// Get a reference to the cached achievement catalog
pub fn achievement_catalog() -> &'static [AchievementDef] {
    &CATALOG
}

/// Look up a definition by slug
pub fn achievement_by_slug(slug: &str) -> Option<&'static AchievementDef> {
    CATALOG.iter().find(|def| def.slug == slug)
}

fn build_achievement_catalog() -> Vec<AchievementDef> {
    vec![
        AchievementDef {
            slug: "first-workout",
            name: "First Workout",
            icon: "🎉",
            kind: AchievementKind::Count,
            threshold: 1.0,
            category: "consistency",
        },
        AchievementDef {
            slug: "week-warrior",
            name: "Week Warrior",
            icon: "⚔️",
            kind: AchievementKind::Count,
            threshold: 3.0,
            category: "consistency",
        },
        AchievementDef {
            slug: "consistency-king",
            name: "Consistency King",
            icon: "👑",
            kind: AchievementKind::Count,
            threshold: 10.0,
            category: "consistency",
        },
        AchievementDef {
            slug: "heavy-lifter-100",
            name: "Heavy Lifter (100kg)",
            icon: "🏋️",
            kind: AchievementKind::WeightRecord,
            threshold: 100.0,
            category: "strength",
        },
        AchievementDef {
            slug: "heavy-lifter-140",
            name: "Elite Lifter (140kg)",
            icon: "🔥",
            kind: AchievementKind::WeightRecord,
            threshold: 140.0,
            category: "strength",
        },
        AchievementDef {
            slug: "volume-novice",
            name: "Volume Novice",
            icon: "📦",
            kind: AchievementKind::VolumeTotal,
            threshold: 5000.0,
            category: "volume",
        },
        AchievementDef {
            slug: "volume-master",
            name: "Volume Master",
            icon: "🏢",
            kind: AchievementKind::VolumeTotal,
            threshold: 50000.0,
            category: "volume",
        },
        AchievementDef {
            slug: "streak-3",
            name: "Three-Day Streak",
            icon: "🔥",
            kind: AchievementKind::Streak,
            threshold: 3.0,
            category: "consistency",
        },
    ]
}
