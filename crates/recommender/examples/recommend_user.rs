//! Example: Recommend movies for one user
//!
//! Run with: cargo run --package recommender --example recommend_user -- [user_id]
//!
//! Loads the MovieLens dataset, prints the user's nearest neighbours, then
//! the recommendations under each similarity metric.

use anyhow::Context;
use data_loader::DataIndex;
use recommender::{DEFAULT_NEIGHBORS, DEFAULT_TOP_N, InMemoryRatingStore, MovieCatalog, Recommender, SimilarityMetric};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let user_id: u32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("user id must be a number")?,
        None => 1,
    };

    println!("=== ReelRecs Recommendation Example ===\n");

    let start = Instant::now();
    let index = DataIndex::load_from_files(Path::new("data/ml-1m"))?;
    println!("Loaded dataset in {:?}\n", start.elapsed());
    let store = Arc::new(InMemoryRatingStore::new(index));

    let recommender = Recommender::new(store.clone());
    let neighbors = recommender.neighbors(user_id, DEFAULT_NEIGHBORS)?;
    println!("Nearest neighbours of user {}:", user_id);
    for neighbor in neighbors.iter().take(5) {
        println!(
            "  user {:>5}  similarity {:.3}  ({} shared movies)",
            neighbor.user_id, neighbor.similarity, neighbor.shared_movies
        );
    }

    for metric in [
        SimilarityMetric::Agreement,
        SimilarityMetric::Pearson,
        SimilarityMetric::Overlap,
    ] {
        let recommender = recommender.clone().with_metric(metric);
        let start = Instant::now();
        let result = recommender.recommend(user_id, DEFAULT_NEIGHBORS, DEFAULT_TOP_N)?;
        println!("\n{} ({:?}):", metric, start.elapsed());

        for (i, item) in result.items.iter().enumerate() {
            let title = store
                .movie(item.movie_id)?
                .map(|m| m.title)
                .unwrap_or_else(|| format!("Movie {}", item.movie_id));
            println!("  {}. {} ({:.2})", i + 1, title, item.predicted_score);
        }
        if result.is_empty() {
            println!("  (no recommendations)");
        }
    }

    Ok(())
}
