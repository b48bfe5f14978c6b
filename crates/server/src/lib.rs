//! Server crate for the ReelRecs recommendation engine.
//!
//! [`RecommendationService`] serves recommendations through the result
//! cache, accepts rating submissions and keeps the cache consistent with
//! them, and covers the session features around that: login, a user's
//! rated movies, title search and result enrichment.

pub mod error;
pub mod service;
pub mod account;
pub mod browse;

#[cfg(test)]
mod testing;

pub use account::{LoginOutcome, RatedMovie, Session};
pub use browse::{MovieRecommendation, SearchHit, SearchResults};
pub use error::{Result, ServiceError};
pub use service::{RatingReceipt, RecommendationService, ServiceStats, ServiceStore};
