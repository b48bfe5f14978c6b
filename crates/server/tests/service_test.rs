//! End-to-end checks of the cache-aware service against a store that
//! counts how often it is read and can hold a computation mid-flight.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use data_loader::{DataIndex, Genre, Movie, MovieId, MovieStats, Rating, TitleSearch, User, UserId};
use recommender::{
    InMemoryRatingStore, MovieCatalog, RatingStore, RatingWrite, RatingWriter, StoreUnavailable,
    UserDirectory,
};
use result_cache::{CacheKey, CacheLookup, MemoryResultCache, ResultCache};
use server::{RecommendationService, ServiceError};

/// Holds the first `ratings_by_movie` call until the test releases it
struct Gate {
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl Gate {
    fn new() -> Self {
        Self {
            armed: AtomicBool::new(true),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }

    fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
    }
}

/// Delegates to an in-memory store and counts rating reads
#[derive(Default)]
struct CountingStore {
    inner: InMemoryRatingStore,
    reads: AtomicUsize,
    gate: Option<Gate>,
}

impl CountingStore {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

impl RatingStore for CountingStore {
    fn user_exists(&self, user_id: UserId) -> Result<bool, StoreUnavailable> {
        self.tick();
        self.inner.user_exists(user_id)
    }

    fn ratings_by_user(&self, user_id: UserId) -> Result<Vec<Rating>, StoreUnavailable> {
        self.tick();
        self.inner.ratings_by_user(user_id)
    }

    fn users_who_rated(&self, movie_id: MovieId) -> Result<BTreeSet<UserId>, StoreUnavailable> {
        self.tick();
        self.inner.users_who_rated(movie_id)
    }

    fn ratings_by_movie(&self, movie_id: MovieId) -> Result<Vec<Rating>, StoreUnavailable> {
        self.tick();
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        self.inner.ratings_by_movie(movie_id)
    }
}

impl RatingWriter for CountingStore {
    fn put_rating(&self, rating: Rating) -> Result<RatingWrite, StoreUnavailable> {
        self.inner.put_rating(rating)
    }
}

impl MovieCatalog for CountingStore {
    fn movie(&self, movie_id: MovieId) -> Result<Option<Movie>, StoreUnavailable> {
        self.inner.movie(movie_id)
    }

    fn movie_stats(&self, movie_id: MovieId) -> Result<Option<MovieStats>, StoreUnavailable> {
        self.inner.movie_stats(movie_id)
    }

    fn search_titles(
        &self,
        query: &str,
        genre: Option<Genre>,
        limit: usize,
    ) -> Result<TitleSearch, StoreUnavailable> {
        self.inner.search_titles(query, genre, limit)
    }
}

impl UserDirectory for CountingStore {
    fn user(&self, user_id: UserId) -> Result<Option<User>, StoreUnavailable> {
        self.inner.user(user_id)
    }

    fn register_user(&self, user_id: UserId, name: &str) -> Result<User, StoreUnavailable> {
        self.inner.register_user(user_id, name)
    }
}

/// Users 1 and 2 share tastes; users 12 and 13 share tastes with each
/// other and a movie with user 1.
fn build_store() -> Arc<CountingStore> {
    build_store_with(None)
}

fn build_store_with(gate: Option<Gate>) -> Arc<CountingStore> {
    let mut index = DataIndex::new();
    for id in [1, 2, 12, 13] {
        index.insert_user(User::new(id));
    }
    for id in 1..=8 {
        index.insert_movie(Movie {
            id,
            title: format!("Movie {} (1999)", id),
            year: Some(1999),
            genres: vec![Genre::Drama],
        });
    }
    let ratings = [
        (1, 1, 5.0),
        (1, 2, 4.0),
        (2, 1, 5.0),
        (2, 2, 4.0),
        (2, 3, 4.5),
        (2, 4, 2.0),
        (12, 2, 3.0),
        (12, 5, 4.0),
        (12, 6, 3.5),
        (13, 5, 4.0),
        (13, 7, 5.0),
    ];
    for (user_id, movie_id, rating) in ratings {
        index.insert_rating(Rating {
            user_id,
            movie_id,
            rating,
            timestamp: 978300760,
        });
    }
    index.build_secondary_indices();
    index.compute_movie_stats();

    Arc::new(CountingStore {
        inner: InMemoryRatingStore::new(index),
        reads: AtomicUsize::new(0),
        gate,
    })
}

fn build_service() -> (
    RecommendationService<CountingStore, MemoryResultCache>,
    Arc<CountingStore>,
    Arc<MemoryResultCache>,
) {
    let store = build_store();
    let cache = Arc::new(MemoryResultCache::new());
    (
        RecommendationService::new(store.clone(), cache.clone()),
        store,
        cache,
    )
}

#[test]
fn test_cache_hit_reads_nothing_from_store() {
    let (service, store, _) = build_service();

    let first = service.get_recommendations(1, 5, 5).unwrap();
    let reads_after_miss = store.reads();
    assert!(reads_after_miss > 0);

    let second = service.get_recommendations(1, 5, 5).unwrap();
    assert_eq!(store.reads(), reads_after_miss);
    assert_eq!(first, second);
    assert_eq!(service.stats().hits, 1);
}

#[test]
fn test_hit_equals_fresh_computation() {
    let (service, _, _) = build_service();

    let cached = {
        service.get_recommendations(1, 5, 5).unwrap();
        service.get_recommendations(1, 5, 5).unwrap()
    };
    let direct = service.recommender().recommend(1, 5, 5).unwrap();
    assert_eq!(cached, direct);
}

#[test]
fn test_rating_invalidates_only_the_author() {
    let (service, store, cache) = build_service();

    for user_id in [1, 2, 12] {
        service.get_recommendations(user_id, 5, 5).unwrap();
    }

    // User 12 rated movie 5 as well, yet their entry stays fresh
    let receipt = service.submit_rating(1, 5, 1.0).unwrap();
    assert_eq!(receipt.invalidated, 1);

    assert_eq!(cache.get(&CacheKey::new(1, 5)).unwrap(), CacheLookup::Stale);
    assert!(matches!(cache.get(&CacheKey::new(2, 5)).unwrap(), CacheLookup::Fresh(_)));
    assert!(matches!(cache.get(&CacheKey::new(12, 5)).unwrap(), CacheLookup::Fresh(_)));

    let reads = store.reads();
    service.get_recommendations(12, 5, 5).unwrap();
    assert_eq!(store.reads(), reads);

    let recomputed = service.get_recommendations(1, 5, 5).unwrap();
    assert!(store.reads() > reads);
    assert!(!recomputed.movie_ids().contains(&5));
    assert_eq!(service.stats().stale_recomputes, 1);
}

#[test]
fn test_every_k_of_the_author_goes_stale() {
    let (service, _, cache) = build_service();

    service.get_recommendations(1, 1, 5).unwrap();
    service.get_recommendations(1, 3, 5).unwrap();
    service.get_recommendations(12, 1, 5).unwrap();

    assert_eq!(service.submit_rating(1, 8, 4.0).unwrap().invalidated, 2);
    assert_eq!(cache.get(&CacheKey::new(1, 1)).unwrap(), CacheLookup::Stale);
    assert_eq!(cache.get(&CacheKey::new(1, 3)).unwrap(), CacheLookup::Stale);
    assert!(matches!(cache.get(&CacheKey::new(12, 1)).unwrap(), CacheLookup::Fresh(_)));
}

#[test]
fn test_cold_start_user_is_cached_empty() {
    let (service, store, _) = build_service();
    service.login(40, || Some("Newcomer".to_string())).unwrap();

    let result = service.get_recommendations(40, 5, 5).unwrap();
    assert!(result.is_empty());

    let reads = store.reads();
    assert!(service.get_recommendations(40, 5, 5).unwrap().is_empty());
    assert_eq!(store.reads(), reads);

    // First rating turns the cold start into real recommendations
    service.submit_rating(40, 1, 5.0).unwrap();
    assert!(!service.get_recommendations(40, 5, 5).unwrap().is_empty());
}

#[test]
fn test_unknown_user_not_cached() {
    let (service, _, cache) = build_service();

    assert!(matches!(
        service.get_recommendations(77, 5, 5),
        Err(ServiceError::Recommend(recommender::RecommendError::UnknownUser(77)))
    ));
    assert!(cache.keys().unwrap().is_empty());
}

#[test]
fn test_concurrent_requests_agree() {
    let (service, _, _) = build_service();
    let expected = service.recommender().recommend(2, 5, 5).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| service.get_recommendations(2, 5, 5).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
    assert_eq!(service.stats().requests(), 8);
}

#[test]
fn test_rating_during_computation_is_not_served_fresh() {
    let store = build_store_with(Some(Gate::new()));
    let cache = Arc::new(MemoryResultCache::new());
    let service = RecommendationService::new(store.clone(), cache.clone());
    let gate = store.gate.as_ref().unwrap();

    std::thread::scope(|scope| {
        let computing = scope.spawn(|| service.get_recommendations(1, 5, 5).unwrap());

        gate.entered.wait();
        service.submit_rating(1, 3, 1.0).unwrap();
        gate.release.wait();

        // Computed from user 1's ratings before the write
        assert!(computing.join().unwrap().movie_ids().contains(&3));
    });

    assert_eq!(cache.get(&CacheKey::new(1, 5)).unwrap(), CacheLookup::Stale);

    let after = service.get_recommendations(1, 5, 5).unwrap();
    assert!(!after.movie_ids().contains(&3));
    assert_eq!(after, service.recommender().recommend(1, 5, 5).unwrap());

    let stats = service.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.stale_recomputes, 1);
}
