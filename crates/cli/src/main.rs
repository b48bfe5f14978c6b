use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{DataIndex, Genre, MAX_SEARCH_RESULTS, MovieId, UserId};
use rand::seq::SliceRandom;
use recommender::{DEFAULT_NEIGHBORS, DEFAULT_TOP_N, InMemoryRatingStore, MovieCatalog, SimilarityMetric};
use result_cache::MemoryResultCache;
use server::{MovieRecommendation, RecommendationService, SearchResults};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

mod session;

pub(crate) type Service = RecommendationService<InMemoryRatingStore, MemoryResultCache>;

/// ReelRecs - Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Movie recommendation engine using collaborative filtering", long_about = None)]
struct Cli {
    /// Path to MovieLens dataset directory
    #[arg(short, long, default_value = "data/ml-1m")]
    data_dir: PathBuf,

    /// Similarity between users: agreement, pearson or overlap
    #[arg(long, default_value_t = SimilarityMetric::Agreement)]
    metric: SimilarityMetric,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get movie recommendations for a user
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        /// Number of nearest neighbours to draw from
        #[arg(long, default_value_t = DEFAULT_NEIGHBORS)]
        neighbors: usize,

        /// Number of recommendations to return
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// Also list the neighbours the recommendations came from
        #[arg(long)]
        explain: bool,
    },

    /// Show user profile and rated movies
    User {
        /// User ID to display
        #[arg(long)]
        user_id: UserId,
    },

    /// Search for movies by title
    Search {
        /// Words to match in the title; `word*` matches a prefix
        #[arg(long)]
        title: String,

        /// Only return movies of this genre
        #[arg(long)]
        genre: Option<Genre>,

        /// Maximum number of results (at most 10)
        #[arg(long, default_value_t = MAX_SEARCH_RESULTS)]
        limit: usize,

        /// Mark the movies this user has already rated
        #[arg(long)]
        user_id: Option<UserId>,
    },

    /// Rate a movie (0.5 to 5.0)
    Rate {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        movie_id: MovieId,

        #[arg(long)]
        rating: f32,
    },

    /// Start an interactive session
    Session,

    /// Compare cold and cached request latency
    Benchmark {
        /// Number of distinct users to request
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading MovieLens dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let index = DataIndex::load_from_files(&cli.data_dir)
        .context("Failed to load MovieLens dataset")?;
    println!("{} Loaded dataset in {:?}", "✓".green(), start.elapsed());

    info!("Using {} similarity", cli.metric);
    let store = Arc::new(InMemoryRatingStore::new(index));
    let service = RecommendationService::new(store, Arc::new(MemoryResultCache::new()))
        .with_metric(cli.metric);

    match cli.command {
        Commands::Recommend {
            user_id,
            neighbors,
            top_n,
            explain,
        } => handle_recommend(&service, user_id, neighbors, top_n, explain)?,
        Commands::User { user_id } => handle_user(&service, user_id)?,
        Commands::Search {
            title,
            genre,
            limit,
            user_id,
        } => handle_search(&service, &title, genre, limit, user_id)?,
        Commands::Rate {
            user_id,
            movie_id,
            rating,
        } => handle_rate(&service, user_id, movie_id, rating)?,
        Commands::Session => session::run(&service)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(service, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'recommend' command
fn handle_recommend(
    service: &Service,
    user_id: UserId,
    neighbors: usize,
    top_n: usize,
    explain: bool,
) -> Result<()> {
    let result = service.get_recommendations(user_id, neighbors, top_n)?;
    if result.is_empty() {
        println!("No recommendations for user {} (no ratings or no neighbours)", user_id);
        return Ok(());
    }
    print_recommendations(&service.describe(&result)?);

    if explain {
        let metric = service.recommender().metric();
        println!("{}", format!("Nearest neighbours by {} similarity:", metric).bold());
        for neighbor in service.recommender().neighbors(user_id, neighbors)? {
            println!(
                "  user {:>5}  similarity {:.3}  {} shared movies",
                neighbor.user_id, neighbor.similarity, neighbor.shared_movies
            );
        }
    }
    Ok(())
}

/// Handle the 'user' command
fn handle_user(service: &Service, user_id: UserId) -> Result<()> {
    let user = service
        .store()
        .with_index(|index| index.get_user(user_id).cloned())?
        .ok_or_else(|| anyhow!("User {} not found", user_id))?;
    let rated = service.rated_movies(user_id)?;

    println!("{}", format!("{} (id {})", user.display_name(), user_id).bold().blue());
    if let Some(demographics) = &user.demographics {
        println!("{}Age: {:?}", "• ".green(), demographics.age);
        println!("{}Gender: {:?}", "• ".green(), demographics.gender);
        println!("{}Occupation: {:?}", "• ".green(), demographics.occupation);
    }

    let avg_rating = match rated.len() {
        0 => 0.0,
        n => rated.iter().map(|r| r.rating).sum::<f32>() / n as f32,
    };
    println!("{}Number of ratings: {}", "• ".cyan(), rated.len());
    println!("{}Average rating: {:.2}", "• ".cyan(), avg_rating);

    println!("Top rated movies:");
    for movie in rated.iter().take(5) {
        println!("  - {} (Rating: {})", movie.title, movie.rating);
    }

    // Average score per genre over everything the user rated
    let mut genre_ratings: HashMap<Genre, (f32, u32)> = HashMap::new();
    for movie in &rated {
        if let Some(details) = service.store().movie(movie.movie_id)? {
            for genre in details.genres {
                let entry = genre_ratings.entry(genre).or_insert((0.0, 0));
                entry.0 += movie.rating;
                entry.1 += 1;
            }
        }
    }
    let mut genre_ratings: Vec<_> = genre_ratings.into_iter().collect();
    genre_ratings.sort_by(|a, b| b.1.1.cmp(&a.1.1).then_with(|| a.0.cmp(&b.0)));

    println!("Genre preferences:");
    for (genre, (total, count)) in genre_ratings {
        println!("  - {}: Average Rating: {:.2} ({} ratings)", genre, total / count as f32, count);
    }
    Ok(())
}

/// Handle the 'search' command
fn handle_search(
    service: &Service,
    title: &str,
    genre: Option<Genre>,
    limit: usize,
    user_id: Option<UserId>,
) -> Result<()> {
    match user_id {
        Some(user_id) => {
            let results = service.search(user_id, title, genre, limit)?;
            print_search(title, &results);
        }
        None => {
            let found = service.store().search_titles(title, genre, limit)?;
            println!("{}", format!("Search results for '{}' ({} matches):", title, found.total).bold().blue());
            for movie_id in found.movie_ids {
                let Some(movie) = service.store().movie(movie_id)? else {
                    continue;
                };
                let stats = service.store().movie_stats(movie_id)?;
                println!(
                    "{}: {} [{}] avg {:.2} ({} ratings)",
                    movie_id,
                    movie.title,
                    movie.genre_labels(),
                    stats.map(|s| s.avg_rating).unwrap_or(0.0),
                    stats.map(|s| s.rating_count).unwrap_or(0)
                );
            }
        }
    }
    Ok(())
}

/// Handle the 'rate' command
fn handle_rate(service: &Service, user_id: UserId, movie_id: MovieId, rating: f32) -> Result<()> {
    let receipt = service.submit_rating(user_id, movie_id, rating)?;
    match receipt.previous {
        Some(previous) => println!("{} Updated rating from {} to {}", "✓".green(), previous, rating),
        None => println!("{} Rated movie {} with {}", "✓".green(), movie_id, rating),
    }
    if let Some(avg) = receipt.new_average {
        println!("Average rating is now {:.2}", avg);
    }
    Ok(())
}

/// Handle the 'benchmark' command.
///
/// Requests every sampled user twice: once against an empty cache, then
/// again once every entry is cached.
async fn handle_benchmark(service: Service, requests: usize, concurrent: usize) -> Result<()> {
    let mut user_ids = service
        .store()
        .with_index(|index| index.get_all_user_ids())?;
    user_ids.shuffle(&mut rand::rng());
    user_ids.truncate(requests);
    if user_ids.is_empty() {
        return Err(anyhow!("No users to benchmark"));
    }

    let cold = run_pass(&service, &user_ids, concurrent).await?;
    let warm = run_pass(&service, &user_ids, concurrent).await?;

    println!("{}", format!("Benchmark over {} users:", user_ids.len()).bold().blue());
    print_latencies("Cold (computed)", &cold);
    print_latencies("Warm (cached)", &warm);

    let stats = service.stats();
    println!(
        "Cache: {} hits, {} misses, hit rate {:.1}%",
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0
    );
    Ok(())
}

/// Run one request per user, at most `concurrent` at a time
async fn run_pass(service: &Service, user_ids: &[UserId], concurrent: usize) -> Result<(Duration, Vec<Duration>)> {
    let semaphore = Arc::new(Semaphore::new(concurrent.max(1)));
    let start = Instant::now();

    let mut handles = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        let permit = semaphore.clone().acquire_owned().await?;
        let service = service.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let start = Instant::now();
            service.get_recommendations(user_id, DEFAULT_NEIGHBORS, DEFAULT_TOP_N)?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(handles.len());
    for handle in handles {
        timings.push(handle.await??);
    }
    Ok((start.elapsed(), timings))
}

fn print_latencies(label: &str, (total, timings): &(Duration, Vec<Duration>)) {
    let mut sorted = timings.clone();
    sorted.sort();
    let percentile = |p: f64| sorted[((sorted.len() - 1) as f64 * p).round() as usize];
    let avg = sorted.iter().sum::<Duration>() / sorted.len() as u32;

    println!("{}", label.bold());
    println!("  Wall time: {:?}", total);
    println!("  Average latency: {:?}", avg);
    println!("  P50 {:?}  P95 {:?}  P99 {:?}", percentile(0.50), percentile(0.95), percentile(0.99));
    println!("  Throughput: {:.2} requests/second", sorted.len() as f64 / total.as_secs_f64());
}

/// Print described recommendations, best first
pub(crate) fn print_recommendations(recommendations: &[MovieRecommendation]) {
    println!("{}", "Movie Recommendations:".bold().blue());
    for (i, rec) in recommendations.iter().enumerate() {
        let genres = rec
            .genres
            .iter()
            .map(|g| g.label())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{}. {} [{}] - Predicted: {:.2}, Average: {:.2}",
            (i + 1).to_string().green(),
            rec.title,
            genres,
            rec.predicted_score,
            rec.avg_rating.unwrap_or(0.0)
        );
    }
}

/// Print search hits with the searching user's own ratings
pub(crate) fn print_search(query: &str, results: &SearchResults) {
    println!(
        "{}",
        format!("Search results for '{}' ({} matches):", query, results.total).bold().blue()
    );
    for hit in &results.hits {
        let seen = match hit.your_rating {
            Some(rating) => format!("seen, you rated {}", rating).green(),
            None => "not seen".normal(),
        };
        let genres = hit.genres.iter().map(|g| g.label()).collect::<Vec<_>>().join(" | ");
        println!(
            "{}: {} [{}] avg {:.2} - {}",
            hit.movie_id,
            hit.title,
            genres,
            hit.avg_rating.unwrap_or(0.0),
            seen
        );
    }
}
