//! Interactive session: log in once, then issue commands against the
//! logged-in user until `quit`.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use data_loader::{Genre, MovieId, UserId};
use recommender::{DEFAULT_NEIGHBORS, DEFAULT_TOP_N};
use server::{LoginOutcome, Session};

use crate::{Service, print_recommendations, print_search};

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Recs { k: usize, top_n: usize },
    Rate { movie_id: MovieId, score: f32 },
    Search { query: String, genre: Option<Genre> },
    Mine,
    Stats,
    Help,
    Quit,
}

const HELP: &str = "\
  recs [k] [n]            recommendations from k neighbours, n results
  rate <movie_id> <score> rate a movie (0.5 to 5.0)
  search <words> [genre=<name>]
                          search titles, `word*` matches a prefix
  mine                    movies you have rated
  stats                   cache statistics
  quit";

fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };

    match verb.to_ascii_lowercase().as_str() {
        "recs" => {
            let k = parse_or(words.next(), DEFAULT_NEIGHBORS, "k")?;
            let top_n = parse_or(words.next(), DEFAULT_TOP_N, "n")?;
            Ok(SessionCommand::Recs { k, top_n })
        }
        "rate" => {
            let movie_id = words
                .next()
                .ok_or("usage: rate <movie_id> <score>")?
                .parse()
                .map_err(|_| "movie id must be a number")?;
            let score = words
                .next()
                .ok_or("usage: rate <movie_id> <score>")?
                .parse()
                .map_err(|_| "score must be a number")?;
            Ok(SessionCommand::Rate { movie_id, score })
        }
        "search" => {
            let mut genre = None;
            let mut terms = Vec::new();
            for word in words {
                match word.strip_prefix("genre=") {
                    Some(name) => genre = Some(name.parse::<Genre>().map_err(|e| e.to_string())?),
                    None => terms.push(word),
                }
            }
            if terms.is_empty() {
                return Err("usage: search <words> [genre=<name>]".to_string());
            }
            Ok(SessionCommand::Search {
                query: terms.join(" "),
                genre,
            })
        }
        "mine" => Ok(SessionCommand::Mine),
        "stats" => Ok(SessionCommand::Stats),
        "help" | "?" => Ok(SessionCommand::Help),
        "quit" | "exit" => Ok(SessionCommand::Quit),
        other => Err(format!("unknown command '{}', try help", other)),
    }
}

fn parse_or(word: Option<&str>, default: usize, name: &str) -> Result<usize, String> {
    match word {
        Some(w) => w.parse().map_err(|_| format!("{} must be a number", name)),
        None => Ok(default),
    }
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, label: &str) -> Result<Option<String>> {
    print!("{}", label.bold());
    io::stdout().flush()?;
    lines.next().transpose().context("Failed to read from stdin")
}

pub fn run(service: &Service) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let user_id: UserId = loop {
        let Some(line) = prompt(&mut lines, "User id: ")? else {
            return Ok(());
        };
        match line.trim().parse() {
            Ok(id) => break id,
            Err(_) => println!("{}", "Please enter a numeric user id".red()),
        }
    };

    let session = service.login(user_id, || {
        prompt(&mut lines, "New here. Your name: ").ok().flatten()
    })?;
    greet(&session);
    println!("{}", HELP);

    loop {
        let Some(line) = prompt(&mut lines, &format!("{}> ", session.name))? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.red());
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break;
        }
        // A failed command doesn't end the session
        if let Err(e) = execute(service, &session, command) {
            println!("{} {:#}", "Error:".red(), e);
        }
    }

    println!("Goodbye, {}!", session.name);
    Ok(())
}

fn greet(session: &Session) {
    let greeting = match session.outcome {
        LoginOutcome::Returning => format!("Welcome back, {}!", session.name),
        LoginOutcome::Named => format!("Nice to meet you, {}!", session.name),
        LoginOutcome::Created => format!("Welcome, {}! Rate a few movies to get recommendations.", session.name),
    };
    println!("{}", greeting.green());
}

fn execute(service: &Service, session: &Session, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Recs { k, top_n } => {
            let result = service.get_recommendations(session.user_id, k, top_n)?;
            if result.is_empty() {
                println!("No recommendations yet. Rate some movies first.");
            } else {
                print_recommendations(&service.describe(&result)?);
            }
        }
        SessionCommand::Rate { movie_id, score } => {
            let receipt = service.submit_rating(session.user_id, movie_id, score)?;
            match receipt.previous {
                Some(previous) => println!("Updated your rating from {} to {}", previous, score),
                None => println!("Rated movie {} with {}", movie_id, score),
            }
            if let Some(avg) = receipt.new_average {
                println!("Average rating is now {:.2}", avg);
            }
        }
        SessionCommand::Search { query, genre } => {
            let results = service.search(session.user_id, &query, genre, data_loader::MAX_SEARCH_RESULTS)?;
            print_search(&query, &results);
        }
        SessionCommand::Mine => {
            let rated = service.rated_movies(session.user_id)?;
            println!("{}", format!("You rated {} movies:", rated.len()).bold().blue());
            for movie in rated {
                println!("  {:>4.1}  {} (id {})", movie.rating, movie.title, movie.movie_id);
            }
        }
        SessionCommand::Stats => {
            let stats = service.stats();
            println!(
                "hits {}  misses {}  stale recomputes {}  hit rate {:.1}%",
                stats.hits,
                stats.misses,
                stats.stale_recomputes,
                stats.hit_rate() * 100.0
            );
        }
        SessionCommand::Help => println!("{}", HELP),
        SessionCommand::Quit => {}
    }
    Ok(())
}
