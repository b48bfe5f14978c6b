//! Values produced by the recommendation engine.

use data_loader::{MovieId, UserId};
use serde::{Deserialize, Serialize};

/// A movie with the score the engine predicts the target user would give it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMovie {
    pub movie_id: MovieId,
    pub predicted_score: f64,
}

/// Ranked recommendations for one (user, k) request.
///
/// Items are ordered by predicted score descending, ties broken by the
/// lower movie id, and never hold more than `top_n` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub user_id: UserId,
    /// Number of neighbours the result was computed from
    pub k: usize,
    /// Size cap the result was computed with
    pub top_n: usize,
    pub items: Vec<ScoredMovie>,
}

impl RecommendationResult {
    /// The cold-start answer: no recommendations
    pub fn empty(user_id: UserId, k: usize, top_n: usize) -> Self {
        Self {
            user_id,
            k,
            top_n,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn movie_ids(&self) -> Vec<MovieId> {
        self.items.iter().map(|item| item.movie_id).collect()
    }

    /// The same ranking cut down to `top_n` entries.
    ///
    /// Ranking is deterministic, so this equals what a fresh computation
    /// with the smaller `top_n` would return.
    pub fn truncated(&self, top_n: usize) -> Self {
        Self {
            user_id: self.user_id,
            k: self.k,
            top_n,
            items: self.items.iter().take(top_n).copied().collect(),
        }
    }
}

/// A user selected to contribute to another user's recommendations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub user_id: UserId,
    pub similarity: f64,
    /// How many movies both users rated
    pub shared_movies: usize,
}
