//! In-process result cache.
//!
//! Entries hold the JSON encoding of a [`RecommendationResult`] plus a
//! freshness flag. Nothing expires on its own: an entry only turns stale
//! through [`ResultCache::invalidate`] and only disappears through
//! [`ResultCache::purge`].
//!
//! Each user prefix also carries a generation counter that
//! [`ResultCache::invalidate`] advances. A result computed while the
//! counter moved is stored stale, so a rating written mid-computation is
//! never hidden behind a fresh entry.

use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use crate::{CacheLookup, ResultCache};
use data_loader::UserId;
use recommender::RecommendationResult;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug, Clone)]
struct Slot {
    payload: String,
    freshness: Freshness,
}

#[derive(Debug, Default)]
struct Entries {
    slots: BTreeMap<String, Slot>,
    /// Invalidation count per prefix; missing means 0
    generations: HashMap<String, u64>,
}

impl Entries {
    fn generation(&self, prefix: &str) -> u64 {
        self.generations.get(prefix).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct MemoryResultCache {
    entries: RwLock<Entries>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw payload under `key` as fresh, bypassing encoding
    pub fn set_raw(&self, key: &CacheKey, payload: impl Into<String>) -> Result<()> {
        self.write()?.slots.insert(
            key.to_string(),
            Slot {
                payload: payload.into(),
                freshness: Freshness::Fresh,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.slots.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.slots.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))
    }
}

impl ResultCache for MemoryResultCache {
    fn get(&self, key: &CacheKey) -> Result<CacheLookup> {
        let entries = self.read()?;
        let Some(slot) = entries.slots.get(&key.to_string()) else {
            return Ok(CacheLookup::Absent);
        };

        match serde_json::from_str::<RecommendationResult>(&slot.payload) {
            Ok(result) => Ok(match slot.freshness {
                Freshness::Fresh => CacheLookup::Fresh(result),
                Freshness::Stale => CacheLookup::Stale,
            }),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                Ok(CacheLookup::Absent)
            }
        }
    }

    fn generation(&self, user_id: UserId) -> Result<u64> {
        Ok(self.read()?.generation(&CacheKey::user_prefix(user_id)))
    }

    fn set(&self, key: &CacheKey, result: &RecommendationResult, generation: u64) -> Result<bool> {
        let payload = serde_json::to_string(result)?;
        let mut entries = self.write()?;

        let current = entries.generation(&CacheKey::user_prefix(key.user_id));
        let freshness = if current == generation {
            Freshness::Fresh
        } else {
            debug!(
                "Storing {} stale, computed at generation {} but user is at {}",
                key, generation, current
            );
            Freshness::Stale
        };
        entries.slots.insert(key.to_string(), Slot { payload, freshness });
        Ok(freshness == Freshness::Fresh)
    }

    fn invalidate(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.write()?;
        *entries.generations.entry(prefix.to_string()).or_insert(0) += 1;

        let mut marked = 0;
        let matching = entries
            .slots
            .range_mut(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (_, slot) in matching {
            if slot.freshness == Freshness::Fresh {
                slot.freshness = Freshness::Stale;
                marked += 1;
            }
        }
        debug!("Marked {} entries under {} stale", marked, prefix);
        Ok(marked)
    }

    fn purge(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.write()?.slots.remove(&key.to_string()).is_some())
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys: Vec<CacheKey> = self
            .read()?
            .slots
            .keys()
            .filter_map(|k| k.parse().ok())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recommender::ScoredMovie;

    fn result(user_id: u32, k: usize, movies: &[(u32, f64)]) -> RecommendationResult {
        RecommendationResult {
            user_id,
            k,
            top_n: movies.len().max(1),
            items: movies
                .iter()
                .map(|&(movie_id, predicted_score)| ScoredMovie {
                    movie_id,
                    predicted_score,
                })
                .collect(),
        }
    }

    #[test]
    fn test_state_machine() {
        let cache = MemoryResultCache::new();
        let key = CacheKey::new(1, 20);
        let first = result(1, 20, &[(5, 4.75), (4, 3.9)]);

        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Absent);

        assert!(cache.set(&key, &first, 0).unwrap());
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Fresh(first.clone()));

        assert_eq!(cache.invalidate(&CacheKey::user_prefix(1)).unwrap(), 1);
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Stale);

        // Already stale: nothing more to mark
        assert_eq!(cache.invalidate(&CacheKey::user_prefix(1)).unwrap(), 0);

        let second = result(1, 20, &[(6, 4.1)]);
        let generation = cache.generation(1).unwrap();
        assert_eq!(generation, 2);
        assert!(cache.set(&key, &second, generation).unwrap());
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Fresh(second));

        assert!(cache.purge(&key).unwrap());
        assert!(!cache.purge(&key).unwrap());
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Absent);
    }

    #[test]
    fn test_invalidate_is_scoped_to_one_user() {
        let cache = MemoryResultCache::new();
        for (user_id, k) in [(1, 5), (1, 20), (12, 5), (2, 5)] {
            cache.set(&CacheKey::new(user_id, k), &result(user_id, k, &[(9, 3.0)]), 0).unwrap();
        }

        assert_eq!(cache.invalidate(&CacheKey::user_prefix(1)).unwrap(), 2);

        assert_eq!(cache.get(&CacheKey::new(1, 5)).unwrap(), CacheLookup::Stale);
        assert_eq!(cache.get(&CacheKey::new(1, 20)).unwrap(), CacheLookup::Stale);
        assert!(matches!(cache.get(&CacheKey::new(12, 5)).unwrap(), CacheLookup::Fresh(_)));
        assert!(matches!(cache.get(&CacheKey::new(2, 5)).unwrap(), CacheLookup::Fresh(_)));
    }

    #[test]
    fn test_set_after_invalidate_is_stale() {
        let cache = MemoryResultCache::new();
        let key = CacheKey::new(1, 5);

        // Computation starts while nothing is cached
        let seen = cache.generation(1).unwrap();
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Absent);

        // A rating lands before the computation finishes
        assert_eq!(cache.invalidate(&CacheKey::user_prefix(1)).unwrap(), 0);
        assert_eq!(cache.generation(1).unwrap(), seen + 1);

        assert!(!cache.set(&key, &result(1, 5, &[(3, 4.5)]), seen).unwrap());
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Stale);

        // Other users keep their generation
        assert_eq!(cache.generation(12).unwrap(), 0);
        assert!(cache.set(&CacheKey::new(12, 5), &result(12, 5, &[(3, 4.5)]), 0).unwrap());
    }

    #[test]
    fn test_corrupt_payload_reads_as_absent() {
        let cache = MemoryResultCache::new();
        let key = CacheKey::new(3, 10);

        cache.set_raw(&key, "{not json").unwrap();
        assert_eq!(cache.get(&key).unwrap(), CacheLookup::Absent);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_scores_survive_encoding() {
        let cache = MemoryResultCache::new();
        let key = CacheKey::new(4, 20);
        let stored = result(4, 20, &[(1, 4.123456789012345), (2, 1.0 / 3.0)]);

        cache.set(&key, &stored, 0).unwrap();
        match cache.get(&key).unwrap() {
            CacheLookup::Fresh(read) => assert_eq!(read, stored),
            other => panic!("expected fresh entry, got {other:?}"),
        }
    }

    #[test]
    fn test_keys_sorted() {
        let cache = MemoryResultCache::new();
        for (user_id, k) in [(12, 5), (2, 20), (2, 5)] {
            cache.set(&CacheKey::new(user_id, k), &result(user_id, k, &[]), 0).unwrap();
        }
        assert_eq!(
            cache.keys().unwrap(),
            vec![CacheKey::new(2, 5), CacheKey::new(2, 20), CacheKey::new(12, 5)]
        );
    }
}
