//! Error types for the recommendation engine.

use data_loader::UserId;
use thiserror::Error;

/// The backing rating store could not answer a query.
///
/// The engine never retries or masks this; it is handed to the caller
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rating store unavailable: {reason}")]
pub struct StoreUnavailable {
    pub reason: String,
}

impl StoreUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors returned by [`crate::Recommender::recommend`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecommendError {
    /// The target user is not known to the rating store
    #[error("User {0} not found")]
    UnknownUser(UserId),

    /// A request parameter is out of range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    StoreUnavailable(#[from] StoreUnavailable),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
