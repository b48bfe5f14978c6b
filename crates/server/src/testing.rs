//! Shared fixture for the service tests.
//!
//! Users 1 and 2 agree on the three movies they share; user 3 shares only
//! movie 1 with user 1 and rates it far lower.

use std::sync::Arc;

use data_loader::{DataIndex, Genre, Movie, Rating, User};
use recommender::InMemoryRatingStore;
use result_cache::MemoryResultCache;

use crate::service::RecommendationService;

const MOVIES: [(u32, &str, u16, &[Genre]); 6] = [
    (1, "Alien (1979)", 1979, &[Genre::Horror, Genre::SciFi]),
    (2, "Brazil (1985)", 1985, &[Genre::Comedy, Genre::SciFi]),
    (3, "Casablanca (1942)", 1942, &[Genre::Drama, Genre::Romance]),
    (4, "Heat (1995)", 1995, &[Genre::Action, Genre::Crime]),
    (5, "Dune (1984)", 1984, &[Genre::SciFi]),
    (6, "Fargo (1996)", 1996, &[Genre::Crime, Genre::Drama]),
];

const RATINGS: [(u32, u32, f32); 10] = [
    (1, 1, 5.0),
    (1, 2, 4.0),
    (1, 3, 3.0),
    (2, 1, 5.0),
    (2, 2, 4.0),
    (2, 3, 3.5),
    (2, 4, 4.0),
    (2, 5, 5.0),
    (3, 1, 1.0),
    (3, 6, 4.5),
];

pub(crate) fn fixture_store() -> Arc<InMemoryRatingStore> {
    let mut index = DataIndex::new();
    for id in 1..=3 {
        index.insert_user(User::new(id));
    }
    for (id, title, year, genres) in MOVIES {
        index.insert_movie(Movie {
            id,
            title: title.to_string(),
            year: Some(year),
            genres: genres.to_vec(),
        });
    }
    for (user_id, movie_id, rating) in RATINGS {
        index.insert_rating(Rating {
            user_id,
            movie_id,
            rating,
            timestamp: 978300760,
        });
    }
    index.build_secondary_indices();
    index.compute_movie_stats();
    Arc::new(InMemoryRatingStore::new(index))
}

pub(crate) fn service() -> RecommendationService<InMemoryRatingStore, MemoryResultCache> {
    RecommendationService::new(fixture_store(), Arc::new(MemoryResultCache::new()))
}
