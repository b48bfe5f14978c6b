//! Core domain types for the MovieLens dataset.
//!
//! This module defines the fundamental data structures used throughout the system:
//! users, movies, ratings, the derived per-movie statistics and the
//! [`DataIndex`] that holds all of them in memory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DataLoadError;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

/// Lowest score a rating may carry
pub const MIN_RATING: f32 = 0.5;

/// Highest score a rating may carry
pub const MAX_RATING: f32 = 5.0;

/// Returns true when `value` is a score a user may give
pub fn is_valid_rating(value: f32) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&value)
}

// =============================================================================
// User-related Types
// =============================================================================

/// A user of the recommender.
///
/// Users loaded from `users.dat` carry demographics but no name; users
/// that log in through the session flow get a display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub demographics: Option<Demographics>,
}

impl User {
    /// A bare user with neither name nor demographics
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            name: None,
            demographics: None,
        }
    }

    /// The stored name, or `User<id>` when none was given
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("User{}", self.id))
    }
}

/// Demographic attributes from the MovieLens `users.dat` file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographics {
    pub gender: Gender,
    pub age: AgeGroup,
    pub occupation: Occupation,
    pub zipcode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Age groups from the MovieLens dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Under18,
    Age18To24,
    Age25To34,
    Age35To44,
    Age45To49,
    Age50To55,
    Age56Plus,
}

/// Occupation categories from MovieLens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupation {
    Other,
    Academic,
    Artist,
    Clerical,
    CollegeStudent,
    CustomerService,
    Doctor,
    Executive,
    Farmer,
    Homemaker,
    K12Student,
    Lawyer,
    Programmer,
    Retired,
    Sales,
    Scientist,
    SelfEmployed,
    Technician,
    Tradesman,
    Unemployed,
    Writer,
}

// =============================================================================
// Movie-related Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from title (e.g., "Toy Story (1995)")
    pub year: Option<u16>,
    pub genres: Vec<Genre>,
}

impl Movie {
    /// Genres joined the way they are shown to users: `Action | Comedy`
    pub fn genre_labels(&self) -> String {
        self.genres
            .iter()
            .map(|g| g.label())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Movie genres from MovieLens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Children,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Fantasy,
    FilmNoir,
    Horror,
    Musical,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    War,
    Western,
}

impl Genre {
    pub const ALL: [Genre; 18] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Children,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Fantasy,
        Genre::FilmNoir,
        Genre::Horror,
        Genre::Musical,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFi,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// The spelling used in `movies.dat`
    pub fn label(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Children => "Children's",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::FilmNoir => "Film-Noir",
            Genre::Horror => "Horror",
            Genre::Musical => "Musical",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci-Fi",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = DataLoadError;

    /// Accepts the dataset spelling ("Children's", "Sci-Fi") as well as
    /// the same name without punctuation, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Genre::ALL
            .into_iter()
            .find(|genre| {
                let candidate: String = genre
                    .label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                // "Children's" normalizes to "childrens"
                candidate == wanted || (wanted == "children" && *genre == Genre::Children)
            })
            .ok_or_else(|| DataLoadError::InvalidValue {
                field: "genre".to_string(),
                value: s.to_string(),
            })
    }
}

// =============================================================================
// Rating Type
// =============================================================================

/// A single score given by a user to a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value from 0.5 to 5.0
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

// =============================================================================
// Statistics Types
// =============================================================================

/// Aggregate statistics for a movie, recomputed whenever one of its
/// ratings changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovieStats {
    pub avg_rating: f32,
    pub rating_count: u32,
}

impl MovieStats {
    /// Stats over a movie's ratings; `None` when it has none
    pub fn from_ratings(ratings: &[Rating]) -> Option<Self> {
        if ratings.is_empty() {
            return None;
        }
        let total: f32 = ratings.iter().map(|r| r.rating).sum();
        let rating_count = ratings.len() as u32;
        Some(Self {
            avg_rating: total / rating_count as f32,
            rating_count,
        })
    }
}

// =============================================================================
// DataIndex - The Core In-Memory Database
// =============================================================================

/// Holds every user, movie and rating plus the lookup indices built over
/// them.
///
/// Ratings are indexed twice, by user and by movie, and both copies are
/// kept in step by [`DataIndex::upsert_rating`].
#[derive(Debug)]
pub struct DataIndex {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) movies: HashMap<MovieId, Movie>,

    /// All ratings made by each user
    pub(crate) user_ratings: HashMap<UserId, Vec<Rating>>,
    /// All ratings received by each movie
    pub(crate) movie_ratings: HashMap<MovieId, Vec<Rating>>,

    /// Movies grouped by genre (one movie can appear in multiple genre lists)
    pub(crate) genre_index: HashMap<Genre, Vec<MovieId>>,

    pub(crate) movie_stats: HashMap<MovieId, MovieStats>,
}

impl DataIndex {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            movies: HashMap::new(),
            user_ratings: HashMap::new(),
            movie_ratings: HashMap::new(),
            genre_index: HashMap::new(),
            movie_stats: HashMap::new(),
        }
    }

    pub fn get_user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Get all ratings made by a user
    ///
    /// Returns an empty slice if user has no ratings
    pub fn get_user_ratings(&self, user_id: UserId) -> &[Rating] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get all ratings for a movie
    pub fn get_movie_ratings(&self, movie_id: MovieId) -> &[Rating] {
        self.movie_ratings
            .get(&movie_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get the rating a user gave a movie, if any
    pub fn get_rating(&self, user_id: UserId, movie_id: MovieId) -> Option<&Rating> {
        self.get_user_ratings(user_id)
            .iter()
            .find(|r| r.movie_id == movie_id)
    }

    pub fn get_movies_by_genre(&self, genre: Genre) -> &[MovieId] {
        self.genre_index
            .get(&genre)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_movie_stats(&self, movie_id: MovieId) -> Option<&MovieStats> {
        self.movie_stats.get(&movie_id)
    }

    /// All movie ids, ascending
    pub fn get_all_movie_ids(&self) -> Vec<MovieId> {
        let mut ids: Vec<MovieId> = self.movies.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All user ids, ascending
    pub fn get_all_user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Set a user's display name, creating the user if it doesn't exist yet
    pub fn set_user_name(&mut self, id: UserId, name: impl Into<String>) -> &User {
        let user = self.users.entry(id).or_insert_with(|| User::new(id));
        user.name = Some(name.into());
        user
    }

    pub fn insert_movie(&mut self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    /// Append a rating to both rating indices.
    ///
    /// This is the bulk-loading path: it assumes the (user, movie) pair is
    /// not present yet and leaves statistics alone. Duplicates are caught
    /// later by [`DataIndex::validate`]. Use [`DataIndex::upsert_rating`]
    /// for ratings submitted at runtime.
    pub fn insert_rating(&mut self, rating: Rating) {
        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(rating);

        self.movie_ratings
            .entry(rating.movie_id)
            .or_default()
            .push(rating);
    }

    /// Create or overwrite the rating for (user, movie) and recompute the
    /// movie's statistics.
    ///
    /// Returns the rating that was replaced, if there was one.
    pub fn upsert_rating(&mut self, rating: Rating) -> Option<Rating> {
        let by_user = self.user_ratings.entry(rating.user_id).or_default();
        let previous = match by_user.iter_mut().find(|r| r.movie_id == rating.movie_id) {
            Some(existing) => Some(std::mem::replace(existing, rating)),
            None => {
                by_user.push(rating);
                None
            }
        };

        let by_movie = self.movie_ratings.entry(rating.movie_id).or_default();
        match by_movie.iter_mut().find(|r| r.user_id == rating.user_id) {
            Some(existing) => *existing = rating,
            None => by_movie.push(rating),
        }

        self.refresh_movie_stats(rating.movie_id);
        previous
    }

    /// Recompute the statistics of one movie from its current ratings
    pub fn refresh_movie_stats(&mut self, movie_id: MovieId) -> Option<MovieStats> {
        match MovieStats::from_ratings(self.get_movie_ratings(movie_id)) {
            Some(stats) => {
                self.movie_stats.insert(movie_id, stats);
                Some(stats)
            }
            None => {
                self.movie_stats.remove(&movie_id);
                None
            }
        }
    }

    /// Get counts for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_ratings = self.user_ratings.values().map(|v| v.len()).sum();
        (self.users.len(), self.movies.len(), total_ratings)
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}
