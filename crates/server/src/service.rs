//! # Recommendation Service
//!
//! Puts the result cache in front of the recommender:
//! 1. Validate the request (no store or cache access when invalid)
//! 2. Look up `(user, k)` in the cache
//! 3. Fresh entry large enough: serve it, the rating store is not touched
//! 4. Otherwise recompute, store the result fresh, return it
//!
//! A rating write marks every cached entry of its author stale before
//! returning, so the author's next request recomputes. Other users' entries
//! are left alone even when the rated movie appears in them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, instrument};

use data_loader::{MovieId, Rating, UserId, is_valid_rating};
use recommender::{
    MovieCatalog, RatingStore, RatingWriter, RecommendError, RecommendationResult, Recommender,
    SimilarityMetric, UserDirectory, check_parameters,
};
use result_cache::{CacheKey, CacheLookup, ResultCache};

use crate::error::{Result, ServiceError};

/// Everything the service needs from its backing store
pub trait ServiceStore: RatingStore + RatingWriter + MovieCatalog + UserDirectory {}

impl<T: RatingStore + RatingWriter + MovieCatalog + UserDirectory> ServiceStore for T {}

/// Cache counters since the service was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    /// Requests served from a fresh entry
    pub hits: u64,
    /// Requests with no usable entry (absent, unreadable or too short)
    pub misses: u64,
    /// Requests that found a stale entry and recomputed it
    pub stale_recomputes: u64,
}

impl ServiceStats {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses + self.stale_recomputes
    }

    pub fn hit_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_recomputes: AtomicU64,
}

/// What a rating submission changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingReceipt {
    /// The score this user gave the movie before, if any
    pub previous: Option<f32>,
    /// The movie's average after the write
    pub new_average: Option<f32>,
    /// Cached entries of the user marked stale
    pub invalidated: usize,
}

pub struct RecommendationService<S, C> {
    recommender: Recommender<S>,
    cache: Arc<C>,
    counters: Arc<Counters>,
}

impl<S, C> Clone for RecommendationService<S, C> {
    fn clone(&self) -> Self {
        Self {
            recommender: self.recommender.clone(),
            cache: Arc::clone(&self.cache),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<S: ServiceStore, C: ResultCache> RecommendationService<S, C> {
    pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self {
            recommender: Recommender::new(store),
            cache,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Configure the similarity metric used for recomputation
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.recommender = self.recommender.with_metric(metric);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        self.recommender.store()
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn recommender(&self) -> &Recommender<S> {
        &self.recommender
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stale_recomputes: self.counters.stale_recomputes.load(Ordering::Relaxed),
        }
    }

    /// Recommendations for `user_id` from its `k` nearest neighbours, at
    /// most `top_n` of them, served from the cache when possible.
    ///
    /// A fresh entry computed with at least `top_n` items is cut down to
    /// `top_n`; one computed with fewer is recomputed and replaced.
    #[instrument(skip(self))]
    pub fn get_recommendations(&self, user_id: UserId, k: usize, top_n: usize) -> Result<RecommendationResult> {
        check_parameters(k, top_n)?;
        let key = CacheKey::new(user_id, k);
        let generation = self.cache.generation(user_id)?;

        match self.cache.get(&key)? {
            CacheLookup::Fresh(cached) if cached.top_n >= top_n => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                info!("Cache hit for {}", key);
                return Ok(cached.truncated(top_n));
            }
            CacheLookup::Fresh(cached) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Cache entry {} holds top {}, {} requested, recomputing",
                    key, cached.top_n, top_n
                );
            }
            CacheLookup::Stale => {
                self.counters.stale_recomputes.fetch_add(1, Ordering::Relaxed);
                info!("Cache entry {} is stale, recomputing", key);
            }
            CacheLookup::Absent => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                info!("Cache miss for {}", key);
            }
        }

        let result = self.recommender.recommend(user_id, k, top_n)?;
        if self.cache.set(&key, &result, generation)? {
            debug!("Cached {} recommendations under {}", result.len(), key);
        } else {
            info!("User {} rated during computation, cached {} as stale", user_id, key);
        }
        Ok(result)
    }

    /// Create or overwrite `user_id`'s rating of `movie_id`.
    ///
    /// Returns once the movie's average is recomputed and the user's cached
    /// recommendations are marked stale.
    #[instrument(skip(self))]
    pub fn submit_rating(&self, user_id: UserId, movie_id: MovieId, score: f32) -> Result<RatingReceipt> {
        if !is_valid_rating(score) {
            return Err(ServiceError::InvalidRating(score));
        }
        let store = self.store();
        if !store.user_exists(user_id)? {
            return Err(RecommendError::UnknownUser(user_id).into());
        }
        if store.movie(movie_id)?.is_none() {
            return Err(ServiceError::UnknownMovie(movie_id));
        }

        let write = store.put_rating(Rating {
            user_id,
            movie_id,
            rating: score,
            timestamp: now_timestamp(),
        })?;
        let invalidated = self.cache.invalidate(&CacheKey::user_prefix(user_id))?;

        info!(
            "User {} rated movie {} with {} ({} cached entries now stale)",
            user_id, movie_id, score, invalidated
        );
        Ok(RatingReceipt {
            previous: write.previous.map(|r| r.rating),
            new_average: write.stats.map(|s| s.avg_rating),
            invalidated,
        })
    }
}

fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_store, service};
    use result_cache::MemoryResultCache;

    #[test]
    fn test_invalid_parameters_touch_nothing() {
        let service = service();

        let err = service.get_recommendations(1, 0, 5).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Recommend(RecommendError::InvalidParameter { name: "k", .. })
        ));
        assert_eq!(service.stats(), ServiceStats::default());
        assert!(service.cache().keys().unwrap().is_empty());
    }

    #[test]
    fn test_miss_then_hit() {
        let service = service();

        let first = service.get_recommendations(1, 2, 5).unwrap();
        let second = service.get_recommendations(1, 2, 5).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            service.stats(),
            ServiceStats {
                hits: 1,
                misses: 1,
                stale_recomputes: 0
            }
        );
        assert_eq!(service.cache().keys().unwrap(), vec![CacheKey::new(1, 2)]);
    }

    #[test]
    fn test_smaller_top_n_served_from_larger_entry() {
        let service = service();

        let full = service.get_recommendations(1, 2, 5).unwrap();
        let short = service.get_recommendations(1, 2, 1).unwrap();

        assert_eq!(short.top_n, 1);
        assert_eq!(short.items, full.items[..1].to_vec());
        assert_eq!(service.stats().hits, 1);
    }

    #[test]
    fn test_larger_top_n_recomputes() {
        let service = service();

        service.get_recommendations(1, 2, 1).unwrap();
        let larger = service.get_recommendations(1, 2, 5).unwrap();

        assert_eq!(larger.top_n, 5);
        assert!(larger.len() > 1);
        assert_eq!(service.stats().misses, 2);
    }

    #[test]
    fn test_submit_rating_marks_entries_stale() {
        let service = service();
        service.get_recommendations(1, 1, 5).unwrap();
        service.get_recommendations(1, 2, 5).unwrap();

        let receipt = service.submit_rating(1, 4, 2.0).unwrap();
        assert_eq!(receipt.invalidated, 2);
        assert_eq!(receipt.previous, None);
        assert_eq!(receipt.new_average, Some(3.0));

        let again = service.submit_rating(1, 4, 3.0).unwrap();
        assert_eq!(again.previous, Some(2.0));
        assert_eq!(again.invalidated, 0);

        let result = service.get_recommendations(1, 2, 5).unwrap();
        assert!(!result.movie_ids().contains(&4));
        assert_eq!(service.stats().stale_recomputes, 1);
    }

    #[test]
    fn test_submit_rating_validation() {
        let service = service();

        assert!(matches!(
            service.submit_rating(1, 4, 5.5),
            Err(ServiceError::InvalidRating(_))
        ));
        assert!(matches!(
            service.submit_rating(1, 4, 0.0),
            Err(ServiceError::InvalidRating(_))
        ));
        assert!(matches!(
            service.submit_rating(99, 4, 3.0),
            Err(ServiceError::Recommend(RecommendError::UnknownUser(99)))
        ));
        assert!(matches!(
            service.submit_rating(1, 999, 3.0),
            Err(ServiceError::UnknownMovie(999))
        ));
    }

    #[test]
    fn test_corrupt_entry_recomputed() {
        let cache = Arc::new(MemoryResultCache::new());
        let service = RecommendationService::new(fixture_store(), cache.clone());

        cache.set_raw(&CacheKey::new(1, 2), "garbage").unwrap();
        let result = service.get_recommendations(1, 2, 5).unwrap();

        assert!(!result.is_empty());
        assert!(matches!(cache.get(&CacheKey::new(1, 2)).unwrap(), CacheLookup::Fresh(_)));
        assert_eq!(service.stats().misses, 1);
    }

    #[test]
    fn test_stats_hit_rate() {
        let stats = ServiceStats {
            hits: 3,
            misses: 1,
            stale_recomputes: 0,
        };
        assert_eq!(stats.requests(), 4);
        assert!((stats.hit_rate() - 0.75).abs() < 1e-12);
        assert_eq!(ServiceStats::default().hit_rate(), 0.0);
    }
}
