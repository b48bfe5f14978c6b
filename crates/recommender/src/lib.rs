//! # Recommender Crate
//!
//! User-based collaborative filtering over a pluggable rating store.
//!
//! ## Components
//!
//! - **engine**: [`Recommender`], the k-nearest-neighbour pipeline
//!   (candidates, similarity, neighbour selection, prediction, ranking)
//! - **similarity**: [`SimilarityMetric`] variants over co-rated movies
//! - **store**: Store traits and [`InMemoryRatingStore`] over a `DataIndex`
//! - **types**: [`RecommendationResult`] and friends
//! - **error**: [`RecommendError`] and [`StoreUnavailable`]
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use recommender::{InMemoryRatingStore, Recommender, SimilarityMetric};
//! use std::sync::Arc;
//!
//! let index = DataIndex::load_from_files("data/ml-1m".as_ref())?;
//! let store = Arc::new(InMemoryRatingStore::new(index));
//!
//! let recommender = Recommender::new(store).with_metric(SimilarityMetric::Pearson);
//! let result = recommender.recommend(1, 20, 5)?;
//! for item in &result.items {
//!     println!("{} -> {:.2}", item.movie_id, item.predicted_score);
//! }
//! ```

pub mod error;
pub mod types;
pub mod similarity;
pub mod store;
pub mod engine;

pub use engine::{DEFAULT_NEIGHBORS, DEFAULT_TOP_N, Recommender, check_parameters};
pub use error::{RecommendError, Result, StoreUnavailable};
pub use similarity::SimilarityMetric;
pub use store::{InMemoryRatingStore, MovieCatalog, RatingStore, RatingWrite, RatingWriter, UserDirectory};
pub use types::{Neighbor, RecommendationResult, ScoredMovie};
