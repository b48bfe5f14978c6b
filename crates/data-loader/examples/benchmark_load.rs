use data_loader::DataIndex;
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let data_dir = Path::new("data/ml-1m");

    let start = Instant::now();
    let index = DataIndex::load_from_files(data_dir)?;
    let elapsed = start.elapsed();

    let (users, movies, ratings) = index.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Movies: {}", movies);
    println!("Ratings: {}", ratings);
    println!(
        "\nPerformance: {:.0} ratings/second",
        ratings as f64 / elapsed.as_secs_f64()
    );

    let hits = index.search_titles("star war*", None, 5);
    println!("Sample search 'star war*': {} hits", hits.total);
    Ok(())
}
