//! User-based collaborative filtering.
//!
//! ## Algorithm
//! 1. Fetch the target user's ratings (none: cold start, empty result)
//! 2. Candidates: every other user who rated at least one of those movies
//! 3. Score each candidate over the movies both rated
//! 4. Keep the `k` most similar (ties: lower user id)
//! 5. Predict a score for every movie a neighbour rated and the target
//!    hasn't: similarity-weighted average of the neighbours' ratings
//! 6. Rank by prediction (ties: lower movie id) and keep `top_n`

use crate::error::{RecommendError, Result};
use crate::similarity::SimilarityMetric;
use crate::store::RatingStore;
use crate::types::{Neighbor, RecommendationResult, ScoredMovie};
use data_loader::{MovieId, UserId};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result size used when the caller doesn't ask for one
pub const DEFAULT_TOP_N: usize = 5;

/// Neighbour count used when the caller doesn't ask for one
pub const DEFAULT_NEIGHBORS: usize = 20;

/// Reject a zero neighbour count or result size
pub fn check_parameters(k: usize, top_n: usize) -> Result<()> {
    if k == 0 {
        return Err(RecommendError::InvalidParameter {
            name: "k",
            reason: "neighbour count must be positive".to_string(),
        });
    }
    if top_n == 0 {
        return Err(RecommendError::InvalidParameter {
            name: "top_n",
            reason: "result size must be positive".to_string(),
        });
    }
    Ok(())
}

struct Neighborhood {
    neighbors: Vec<Neighbor>,
    /// Movies any neighbour rated that the target hasn't
    unseen: BTreeSet<MovieId>,
}

/// Computes recommendations from a shared rating store
pub struct Recommender<S> {
    store: Arc<S>,
    metric: SimilarityMetric,
    min_shared_movies: usize,
}

impl<S> Clone for Recommender<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metric: self.metric,
            min_shared_movies: self.min_shared_movies,
        }
    }
}

impl<S: RatingStore> Recommender<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metric: SimilarityMetric::default(),
            min_shared_movies: 1,
        }
    }

    /// Configure the similarity metric (default: agreement)
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Configure how many co-rated movies a candidate needs (default: 1, minimum: 1)
    pub fn with_min_shared_movies(mut self, min: usize) -> Self {
        self.min_shared_movies = min.max(1);
        self
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Recommend up to `top_n` unseen movies for `user_id` from its `k`
    /// nearest neighbours.
    ///
    /// Read-only against the store and deterministic for a fixed store
    /// snapshot.
    #[instrument(skip(self), fields(metric = %self.metric))]
    pub fn recommend(&self, user_id: UserId, k: usize, top_n: usize) -> Result<RecommendationResult> {
        check_parameters(k, top_n)?;

        let Some(neighborhood) = self.neighborhood(user_id, k)? else {
            debug!("User {} has no ratings, cold start", user_id);
            return Ok(RecommendationResult::empty(user_id, k, top_n));
        };

        let mut items = self.predict(&neighborhood)?;
        rank(&mut items);
        items.truncate(top_n);

        debug!(
            "Recommended {} movies for user {} from {} neighbours",
            items.len(),
            user_id,
            neighborhood.neighbors.len()
        );
        Ok(RecommendationResult {
            user_id,
            k,
            top_n,
            items,
        })
    }

    /// The `k` neighbours `recommend` would use, most similar first
    pub fn neighbors(&self, user_id: UserId, k: usize) -> Result<Vec<Neighbor>> {
        check_parameters(k, 1)?;
        Ok(self
            .neighborhood(user_id, k)?
            .map(|n| n.neighbors)
            .unwrap_or_default())
    }

    /// Steps 1-4. `None` when the user has no ratings.
    fn neighborhood(&self, user_id: UserId, k: usize) -> Result<Option<Neighborhood>> {
        if !self.store.user_exists(user_id)? {
            return Err(RecommendError::UnknownUser(user_id));
        }

        let ratings = self.store.ratings_by_user(user_id)?;
        if ratings.is_empty() {
            return Ok(None);
        }
        let target: HashMap<MovieId, f32> =
            ratings.iter().map(|r| (r.movie_id, r.rating)).collect();

        let candidates = self.find_candidates(user_id, &target)?;
        debug!("Found {} candidate neighbours", candidates.len());

        let scored = self.score_candidates(&target, &candidates)?;
        let chosen = select_neighbors(scored.iter().map(|(n, _)| *n).collect(), k);

        let chosen_ids: BTreeSet<UserId> = chosen.iter().map(|n| n.user_id).collect();
        let unseen: BTreeSet<MovieId> = scored
            .iter()
            .filter(|(n, _)| chosen_ids.contains(&n.user_id))
            .flat_map(|(_, rated)| rated.iter().copied())
            .filter(|movie_id| !target.contains_key(movie_id))
            .collect();

        Ok(Some(Neighborhood {
            neighbors: chosen,
            unseen,
        }))
    }

    /// Every other user who rated at least one of the target's movies, ascending
    fn find_candidates(&self, user_id: UserId, target: &HashMap<MovieId, f32>) -> Result<Vec<UserId>> {
        let mut candidates = BTreeSet::new();
        for &movie_id in target.keys() {
            candidates.extend(self.store.users_who_rated(movie_id)?);
        }
        candidates.remove(&user_id);
        Ok(candidates.into_iter().collect())
    }

    /// Similarity for each candidate with enough co-rated movies, paired
    /// with the ids of everything that candidate rated.
    ///
    /// Scoring runs in parallel; output keeps candidate order.
    fn score_candidates(
        &self,
        target: &HashMap<MovieId, f32>,
        candidates: &[UserId],
    ) -> Result<Vec<(Neighbor, Vec<MovieId>)>> {
        let scored = candidates
            .par_iter()
            .map(|&candidate| -> Result<Option<(Neighbor, Vec<MovieId>)>> {
                let ratings = self.store.ratings_by_user(candidate)?;
                let shared: Vec<(f32, f32)> = ratings
                    .iter()
                    .filter_map(|r| target.get(&r.movie_id).map(|&own| (own, r.rating)))
                    .collect();
                if shared.len() < self.min_shared_movies {
                    return Ok(None);
                }
                let neighbor = Neighbor {
                    user_id: candidate,
                    similarity: self.metric.similarity(&shared),
                    shared_movies: shared.len(),
                };
                Ok(Some((neighbor, ratings.iter().map(|r| r.movie_id).collect())))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(scored.into_iter().flatten().collect())
    }

    /// Step 5: similarity-weighted average per unseen movie.
    ///
    /// Movies whose neighbour weights sum to zero are dropped.
    fn predict(&self, neighborhood: &Neighborhood) -> Result<Vec<ScoredMovie>> {
        let weights: HashMap<UserId, f64> = neighborhood
            .neighbors
            .iter()
            .map(|n| (n.user_id, n.similarity))
            .collect();
        let movies: Vec<MovieId> = neighborhood.unseen.iter().copied().collect();

        let predictions = movies
            .par_iter()
            .map(|&movie_id| -> Result<Option<ScoredMovie>> {
                let (mut weighted, mut total_weight) = (0.0_f64, 0.0_f64);
                for rating in self.store.ratings_by_movie(movie_id)? {
                    if let Some(&weight) = weights.get(&rating.user_id) {
                        weighted += weight * f64::from(rating.rating);
                        total_weight += weight;
                    }
                }
                if total_weight <= 0.0 {
                    return Ok(None);
                }
                Ok(Some(ScoredMovie {
                    movie_id,
                    predicted_score: weighted / total_weight,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(predictions.into_iter().flatten().collect())
    }
}

/// Most similar first, ties to the lower user id, at most `k`
fn select_neighbors(mut scored: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    scored.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    scored.truncate(k);
    scored
}

/// Highest prediction first, ties to the lower movie id
fn rank(items: &mut [ScoredMovie]) {
    items.sort_by(|a, b| {
        b.predicted_score
            .total_cmp(&a.predicted_score)
            .then_with(|| a.movie_id.cmp(&b.movie_id))
    });
}
