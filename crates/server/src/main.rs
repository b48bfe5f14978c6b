//! Test harness for the recommendation service.
//!
//! Loads the dataset, then walks one user through a cold request, a cached
//! request, a rating submission and the recomputation it triggers.
//!
//! Usage: server [data_dir] [user_id]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use data_loader::{DataIndex, UserId};
use recommender::{DEFAULT_NEIGHBORS, DEFAULT_TOP_N, InMemoryRatingStore};
use result_cache::MemoryResultCache;
use server::RecommendationService;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Walk one user through cached and recomputed recommendations", long_about = None)]
struct Args {
    /// Path to MovieLens dataset directory
    #[arg(default_value = "data/ml-1m")]
    data_dir: PathBuf,

    #[arg(default_value_t = 1)]
    user_id: UserId,
}

fn main() -> Result<()> {
    let Args { data_dir, user_id } = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Loading data index from {}", data_dir.display());
    let index = DataIndex::load_from_files(&data_dir)?;
    let store = Arc::new(InMemoryRatingStore::new(index));
    let service = RecommendationService::new(store, Arc::new(MemoryResultCache::new()));

    let start = Instant::now();
    let cold = service.get_recommendations(user_id, DEFAULT_NEIGHBORS, DEFAULT_TOP_N)?;
    info!("Cold request: {} items in {:.2?}", cold.len(), start.elapsed());

    let start = Instant::now();
    let warm = service.get_recommendations(user_id, DEFAULT_NEIGHBORS, DEFAULT_TOP_N)?;
    info!("Warm request: {} items in {:.2?}", warm.len(), start.elapsed());

    for (i, rec) in service.describe(&warm)?.iter().enumerate() {
        info!(
            "{}. {} - predicted {:.2}",
            i + 1,
            rec.title,
            rec.predicted_score
        );
    }

    let Some(top) = warm.items.first() else {
        info!("No recommendations for user {}, nothing to rate", user_id);
        return Ok(());
    };
    let receipt = service.submit_rating(user_id, top.movie_id, 4.0)?;
    info!(
        "Rated movie {}: average now {:?}, {} cached entries stale",
        top.movie_id, receipt.new_average, receipt.invalidated
    );

    let start = Instant::now();
    let after = service.get_recommendations(user_id, DEFAULT_NEIGHBORS, DEFAULT_TOP_N)?;
    info!("Recomputed: {} items in {:.2?}", after.len(), start.elapsed());

    let stats = service.stats();
    info!(
        "hits={} misses={} stale_recomputes={}",
        stats.hits, stats.misses, stats.stale_recomputes
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["server"]).unwrap();
        assert_eq!(args.data_dir, PathBuf::from("data/ml-1m"));
        assert_eq!(args.user_id, 1);

        let args = Args::try_parse_from(["server", "data/small", "42"]).unwrap();
        assert_eq!(args.data_dir, PathBuf::from("data/small"));
        assert_eq!(args.user_id, 42);

        assert!(Args::try_parse_from(["server", "data/small", "abc"]).is_err());
    }
}
