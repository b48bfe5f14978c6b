use data_loader::{MAX_RATING, MIN_RATING, MovieId};
use recommender::{RecommendError, StoreUnavailable};
use result_cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Recommend(#[from] RecommendError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Movie {0} not found")]
    UnknownMovie(MovieId),

    #[error("Rating {0} is outside {min}..={max}", min = MIN_RATING, max = MAX_RATING)]
    InvalidRating(f32),
}

impl From<StoreUnavailable> for ServiceError {
    fn from(err: StoreUnavailable) -> Self {
        ServiceError::Recommend(RecommendError::StoreUnavailable(err))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
