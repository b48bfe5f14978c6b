//! # Data Loader Crate
//!
//! Loads the MovieLens 1M dataset and keeps it in an in-memory
//! [`DataIndex`] that the recommender reads ratings from and the rating
//! submission path writes to.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (User, Movie, Rating, MovieStats, DataIndex)
//! - **parser**: Parse .dat files into Rust structs
//! - **index**: Build indices, statistics and validate the loaded data
//! - **search**: Title search over the catalog
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data/ml-1m"))?;
//!
//! let ratings = index.get_user_ratings(1);
//! let hits = index.search_titles("star war*", None, 10);
//! println!("User 1 rated {} movies, {} titles match", ratings.len(), hits.total);
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod index;
pub mod search;

pub use error::{DataLoadError, Result};
pub use search::{MAX_SEARCH_RESULTS, TitleSearch};
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    // Rating bounds
    MIN_RATING,
    MAX_RATING,
    is_valid_rating,
    // Core types
    User,
    Demographics,
    Movie,
    Rating,
    DataIndex,
    MovieStats,
    // Enums
    Gender,
    AgeGroup,
    Occupation,
    Genre,
};
