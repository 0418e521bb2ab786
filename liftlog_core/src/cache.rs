//! TTL cache for computed aggregates.
//!
//! Keys always embed the user id, so entries for different users can never
//! collide. Key shapes are a contract read by other layers and must not
//! change; the builders in [`keys`] are the single source of truth.

use crate::Result;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// Process-wide stats cache with per-entry TTL
#[derive(Clone, Debug, Default)]
pub struct StatsCache {
    entries: HashMap<String, CacheEntry>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or compute, cache and return it.
    ///
    /// An expired entry is treated as absent and recomputed in place.
    pub fn remember<T, F>(
        &mut self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                tracing::trace!("cache hit: {}", key);
                return Ok(serde_json::from_value(entry.value.clone())?);
            }
        }

        tracing::trace!("cache miss: {}", key);
        let value = compute();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: serde_json::to_value(&value)?,
                expires_at: now + ttl,
            },
        );
        Ok(value)
    }

    /// Evict a single key
    pub fn forget(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::trace!("cache evict: {}", key);
        }
    }

    /// Whether a live (non-expired) entry exists for `key`
    pub fn contains(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(key)
            .map(|e| e.expires_at > now)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Well-known cache key builders.
///
/// These shapes are read directly by other layers; keep them stable.
pub mod keys {
    use uuid::Uuid;

    pub fn volume_trend(user_id: Uuid, days: u32) -> String {
        format!("stats.volume_trend.{}.{}", user_id, days)
    }

    pub fn daily_volume(user_id: Uuid, days: u32) -> String {
        format!("stats.daily_volume.{}.{}", user_id, days)
    }

    pub fn weekly_volume(user_id: Uuid) -> String {
        format!("stats.weekly_volume.{}", user_id)
    }

    pub fn weekly_volume_comparison(user_id: Uuid) -> String {
        format!("stats.weekly_volume_comparison.{}", user_id)
    }

    pub fn monthly_volume_comparison(user_id: Uuid) -> String {
        format!("stats.monthly_volume_comparison.{}", user_id)
    }

    pub fn monthly_volume_history(user_id: Uuid, months: u32) -> String {
        format!("stats.monthly_volume_history.{}.{}", user_id, months)
    }

    pub fn muscle_distribution(user_id: Uuid, days: u32) -> String {
        format!("stats.muscle_dist.{}.{}", user_id, days)
    }

    pub fn one_rm_progress(user_id: Uuid, exercise_id: Uuid, days: u32) -> String {
        format!("stats.one_rm.{}.{}.{}", user_id, exercise_id, days)
    }

    pub fn weight_history(user_id: Uuid, days: u32) -> String {
        format!("stats.weight_history.{}.{}", user_id, days)
    }

    pub fn body_fat_history(user_id: Uuid, days: u32) -> String {
        format!("stats.body_fat_history.{}.{}", user_id, days)
    }

    pub fn duration_history(user_id: Uuid, limit: u32) -> String {
        format!("stats.duration_history.{}.{}", user_id, limit)
    }

    pub fn volume_history(user_id: Uuid, limit: u32) -> String {
        format!("stats.volume_history.{}.{}", user_id, limit)
    }

    pub fn duration_distribution(user_id: Uuid, days: u32) -> String {
        format!("stats.duration_distribution.{}.{}", user_id, days)
    }

    pub fn dashboard(user_id: Uuid) -> String {
        format!("dashboard_data_{}", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_remember_computes_once_within_ttl() {
        let mut cache = StatsCache::new();
        let now = Utc::now();
        let ttl = Duration::seconds(600);

        let mut calls = 0;
        let first: i64 = cache
            .remember("stats.test.key", ttl, now, || {
                calls += 1;
                42
            })
            .unwrap();
        let second: i64 = cache
            .remember("stats.test.key", ttl, now, || {
                calls += 1;
                99
            })
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_expired_entry_is_recomputed() {
        let mut cache = StatsCache::new();
        let now = Utc::now();
        let ttl = Duration::seconds(600);

        let _: i64 = cache.remember("k", ttl, now, || 1).unwrap();

        let later = now + Duration::seconds(601);
        let value: i64 = cache.remember("k", ttl, later, || 2).unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn test_forget_evicts() {
        let mut cache = StatsCache::new();
        let now = Utc::now();

        let _: i64 = cache.remember("k", Duration::seconds(600), now, || 1).unwrap();
        assert!(cache.contains("k", now));

        cache.forget("k");
        assert!(!cache.contains("k", now));
    }

    #[test]
    fn test_keys_are_user_scoped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_ne!(keys::weekly_volume(a), keys::weekly_volume(b));
        assert_ne!(keys::dashboard(a), keys::dashboard(b));

        // Key shape is a published contract
        assert_eq!(
            keys::volume_trend(a, 30),
            format!("stats.volume_trend.{}.30", a)
        );
        assert_eq!(keys::dashboard(a), format!("dashboard_data_{}", a));
    }

    #[test]
    fn test_cached_values_do_not_cross_users() {
        let mut cache = StatsCache::new();
        let now = Utc::now();
        let ttl = Duration::seconds(600);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let for_a: f64 = cache
            .remember(&keys::weekly_volume(a), ttl, now, || 1000.0)
            .unwrap();
        let for_b: f64 = cache
            .remember(&keys::weekly_volume(b), ttl, now, || 250.0)
            .unwrap();

        assert_eq!(for_a, 1000.0);
        assert_eq!(for_b, 250.0);
    }
}
