//! DataIndex building and indexing logic.
//!
//! Builds the DataIndex from parsed data:
//! - primary indices (users, movies, ratings by user and by movie)
//! - the genre index
//! - per-movie statistics
//! and validates referential integrity before the index is handed out.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

impl DataIndex {
    /// Load the entire MovieLens dataset from a directory
    ///
    /// Steps:
    /// 1. Parse all three files (users, movies, ratings) in parallel
    /// 2. Build primary indices
    /// 3. Build the genre index
    /// 4. Compute movie statistics
    /// 5. Validate data integrity
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading MovieLens dataset from {:?}", data_dir);

        let users_path = data_dir.join("users.dat");
        let movies_path = data_dir.join("movies.dat");
        let ratings_path = data_dir.join("ratings.dat");

        // Nested joins give three-way parallelism
        let ((users, movies), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_users(&users_path),
                    || parser::parse_movies(&movies_path),
                )
            },
            || parser::parse_ratings(&ratings_path),
        );

        let users = users?;
        let movies = movies?;
        let ratings = ratings?;

        info!(
            "Parsed {} users, {} movies, {} ratings",
            users.len(),
            movies.len(),
            ratings.len()
        );

        let mut index = DataIndex::new();
        for user in users {
            index.insert_user(user);
        }
        for movie in movies {
            index.insert_movie(movie);
        }
        for rating in ratings {
            index.insert_rating(rating);
        }

        index.build_secondary_indices();
        index.compute_movie_stats();
        index.validate()?;

        info!("DataIndex successfully built and validated");
        Ok(index)
    }

    /// Build the genre index after primary data is loaded.
    ///
    /// Each genre list is sorted so lookups return ids in a stable order.
    pub fn build_secondary_indices(&mut self) {
        self.genre_index.clear();
        for (movie_id, movie) in &self.movies {
            for &genre in &movie.genres {
                self.genre_index.entry(genre).or_default().push(*movie_id);
            }
        }
        for ids in self.genre_index.values_mut() {
            ids.sort_unstable();
        }
    }

    /// Compute average rating and rating count for every rated movie
    pub fn compute_movie_stats(&mut self) {
        self.movie_stats = self
            .movie_ratings
            .par_iter()
            .filter_map(|(&movie_id, ratings)| {
                MovieStats::from_ratings(ratings).map(|stats| (movie_id, stats))
            })
            .collect();
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - All rating.user_id references exist in users
    /// - All rating.movie_id references exist in movies
    /// - Ratings are in the valid range (0.5 - 5.0)
    /// - No (user, movie) pair is rated twice
    pub fn validate(&self) -> Result<()> {
        for ratings in self.user_ratings.values() {
            let mut seen = HashSet::with_capacity(ratings.len());
            for rating in ratings {
                if !self.users.contains_key(&rating.user_id) {
                    return Err(DataLoadError::MissingReference {
                        entity: "User".to_string(),
                        id: rating.user_id,
                    });
                }
                if !self.movies.contains_key(&rating.movie_id) {
                    return Err(DataLoadError::MissingReference {
                        entity: "Movie".to_string(),
                        id: rating.movie_id,
                    });
                }
                if !is_valid_rating(rating.rating) {
                    return Err(DataLoadError::InvalidValue {
                        field: "rating".to_string(),
                        value: rating.rating.to_string(),
                    });
                }
                if !seen.insert(rating.movie_id) {
                    return Err(DataLoadError::DuplicateRating {
                        user_id: rating.user_id,
                        movie_id: rating.movie_id,
                    });
                }
            }
        }
        Ok(())
    }
}
