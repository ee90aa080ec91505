//! Bounded cache of aggregate results keyed by filter signature.
//!
//! Entries are never invalidated individually: an entry computed against an
//! older dataset version is simply ignored and evicted on lookup.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use super::aggregator::AggregateResult;

#[derive(Debug, Clone)]
pub struct AggregatedStats {
    pub signature: String,
    pub dataset_version: u64,
    pub calculated_at: DateTime<Utc>,
    pub result: AggregateResult,
}

pub struct StatsCache {
    entries: Mutex<LruCache<String, AggregatedStats>>,
}

impl StatsCache {
    const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(Self::DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, signature: &str, dataset_version: u64) -> Option<AggregatedStats> {
        let mut entries = self.entries.lock().ok()?;
        let stale = match entries.get(signature) {
            Some(stats) if stats.dataset_version == dataset_version => return Some(stats.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            entries.pop(signature);
        }
        None
    }

    pub fn insert(&self, signature: String, dataset_version: u64, result: AggregateResult) {
        let stats = AggregatedStats {
            signature: signature.clone(),
            dataset_version,
            calculated_at: Utc::now(),
            result,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(signature, stats);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(total: u64) -> AggregateResult {
        AggregateResult { total_photos: total, ..Default::default() }
    }

    #[test]
    fn test_hit_on_matching_version() {
        let cache = StatsCache::new(4);
        cache.insert("*".into(), 3, result(10));
        let hit = cache.get("*", 3).unwrap();
        assert_eq!(hit.result.total_photos, 10);
        assert_eq!(hit.dataset_version, 3);
    }

    #[test]
    fn test_version_mismatch_evicts() {
        let cache = StatsCache::new(4);
        cache.insert("*".into(), 3, result(10));
        assert!(cache.get("*", 4).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = StatsCache::new(2);
        cache.insert("a".into(), 1, result(1));
        cache.insert("b".into(), 1, result(2));
        cache.insert("c".into(), 1, result(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", 1).is_none());
        assert!(cache.get("c", 1).is_some());
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        let cache = StatsCache::new(0);
        cache.insert("a".into(), 1, result(1));
        assert_eq!(cache.len(), 1);
    }
}
