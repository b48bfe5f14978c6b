//! Title search and result enrichment.

use std::collections::HashMap;

use tracing::{debug, warn};

use data_loader::{Genre, MovieId, UserId};
use recommender::{RecommendError, RecommendationResult};
use result_cache::ResultCache;

use crate::error::Result;
use crate::service::{RecommendationService, ServiceStore};

/// A recommended movie with its catalog details
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<Genre>,
    pub year: Option<u16>,
    pub predicted_score: f64,
    pub avg_rating: Option<f32>,
}

/// One title search hit, seen from the searching user
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<Genre>,
    pub avg_rating: Option<f32>,
    /// Whether the user has rated it
    pub seen: bool,
    pub your_rating: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    /// Matches before the limit was applied
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

impl<S: ServiceStore, C: ResultCache> RecommendationService<S, C> {
    /// Search titles for `user_id`.
    ///
    /// `limit` is clamped to `1..=MAX_SEARCH_RESULTS`.
    pub fn search(
        &self,
        user_id: UserId,
        query: &str,
        genre: Option<Genre>,
        limit: usize,
    ) -> Result<SearchResults> {
        let store = self.store();
        if !store.user_exists(user_id)? {
            return Err(RecommendError::UnknownUser(user_id).into());
        }

        let found = store.search_titles(query, genre, limit)?;
        let own: HashMap<MovieId, f32> = store
            .ratings_by_user(user_id)?
            .into_iter()
            .map(|r| (r.movie_id, r.rating))
            .collect();

        let mut hits = Vec::with_capacity(found.movie_ids.len());
        for movie_id in found.movie_ids {
            let Some(movie) = store.movie(movie_id)? else {
                continue;
            };
            let your_rating = own.get(&movie_id).copied();
            hits.push(SearchHit {
                movie_id,
                title: movie.title,
                genres: movie.genres,
                avg_rating: store.movie_stats(movie_id)?.map(|s| s.avg_rating),
                seen: your_rating.is_some(),
                your_rating,
            });
        }

        debug!("Search '{}' matched {} titles", query, found.total);
        Ok(SearchResults {
            total: found.total,
            hits,
        })
    }

    /// Attach titles, genres and averages to a computed result
    pub fn describe(&self, result: &RecommendationResult) -> Result<Vec<MovieRecommendation>> {
        let store = self.store();
        let mut described = Vec::with_capacity(result.len());

        for item in &result.items {
            let Some(movie) = store.movie(item.movie_id)? else {
                warn!("Recommended movie {} missing from catalog", item.movie_id);
                continue;
            };
            described.push(MovieRecommendation {
                movie_id: item.movie_id,
                title: movie.title,
                genres: movie.genres,
                year: movie.year,
                predicted_score: item.predicted_score,
                avg_rating: store.movie_stats(item.movie_id)?.map(|s| s.avg_rating),
            });
        }
        Ok(described)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::service;
    use data_loader::MAX_SEARCH_RESULTS;

    #[test]
    fn test_search_marks_seen_movies() {
        let service = service();

        let results = service.search(1, "alien", None, 10).unwrap();
        assert_eq!(results.total, 1);
        let hit = &results.hits[0];
        assert_eq!(hit.title, "Alien (1979)");
        assert!(hit.seen);
        assert_eq!(hit.your_rating, Some(5.0));

        let results = service.search(1, "dune", None, 10).unwrap();
        assert!(!results.hits[0].seen);
        assert_eq!(results.hits[0].your_rating, None);
    }

    #[test]
    fn test_search_genre_and_prefix() {
        let service = service();

        let results = service.search(1, "b*", Some(Genre::SciFi), 10).unwrap();
        let titles: Vec<&str> = results.hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Brazil (1985)"]);
    }

    #[test]
    fn test_search_limit_clamped() {
        let service = service();

        // Every fixture title carries a 19xx year
        let results = service.search(1, "19*", None, 0).unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.total, 6);

        let results = service.search(1, "19*", None, 1000).unwrap();
        assert_eq!(results.hits.len(), 6);
        assert!(results.hits.len() <= MAX_SEARCH_RESULTS);

        assert!(service.search(1, "*", None, 5).unwrap().hits.is_empty());
    }

    #[test]
    fn test_describe() {
        let service = service();

        let result = service.get_recommendations(1, 2, 5).unwrap();
        let described = service.describe(&result).unwrap();

        assert_eq!(described.len(), result.len());
        assert_eq!(described[0].title, "Dune (1984)");
        assert_eq!(described[0].year, Some(1984));
        assert_eq!(described[0].predicted_score, result.items[0].predicted_score);
    }
}
