use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Result cache unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode cached result: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
