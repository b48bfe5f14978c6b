//! Title search over the movie catalog.
//!
//! Query syntax is deliberately small:
//! - terms are matched against the lowercase words of a title
//! - a term ending in `*` matches any word with that prefix (`war*`)
//! - every term must match
//!
//! Hits are ranked exact-title first, then by average rating, then by id.

use crate::types::{DataIndex, Genre, MovieId};
use std::cmp::Ordering;

/// Upper bound on the number of hits returned by one search
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Result of a title search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSearch {
    /// Number of movies that matched before the limit was applied
    pub total: usize,
    /// Matching movie ids, best first, at most `limit` of them
    pub movie_ids: Vec<MovieId>,
}

/// A parsed query term
#[derive(Debug, PartialEq, Eq)]
enum Term {
    Word(String),
    Prefix(String),
}

impl Term {
    fn matches(&self, words: &[String]) -> bool {
        match self {
            Term::Word(term) => words.iter().any(|w| w == term),
            Term::Prefix(prefix) => words.iter().any(|w| w.starts_with(prefix.as_str())),
        }
    }
}

/// Split text into lowercase alphanumeric words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn parse_query(query: &str) -> Vec<Term> {
    query
        .split_whitespace()
        .filter_map(|raw| {
            let prefix = raw.ends_with('*');
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            match (word.is_empty(), prefix) {
                (true, _) => None,
                (false, true) => Some(Term::Prefix(word)),
                (false, false) => Some(Term::Word(word)),
            }
        })
        .collect()
}

/// Title without its trailing "(year)", lowercased
fn bare_title(title: &str) -> String {
    let trimmed = match title.rfind(" (") {
        Some(idx) if title.ends_with(')') => &title[..idx],
        _ => title,
    };
    trimmed.trim().to_lowercase()
}

impl DataIndex {
    /// Search movie titles, optionally restricted to one genre.
    ///
    /// `limit` is clamped to `1..=MAX_SEARCH_RESULTS`. An empty query
    /// matches nothing.
    pub fn search_titles(&self, query: &str, genre: Option<Genre>, limit: usize) -> TitleSearch {
        let limit = limit.clamp(1, MAX_SEARCH_RESULTS);
        let terms = parse_query(query);
        if terms.is_empty() {
            return TitleSearch {
                total: 0,
                movie_ids: Vec::new(),
            };
        }
        let wanted = query.trim().to_lowercase();

        let pool: Vec<MovieId> = match genre {
            Some(genre) => self.get_movies_by_genre(genre).to_vec(),
            None => self.get_all_movie_ids(),
        };

        // (exact title match, average rating, id)
        let mut hits: Vec<(bool, f32, MovieId)> = pool
            .into_iter()
            .filter_map(|movie_id| {
                let movie = self.get_movie(movie_id)?;
                let words = tokenize(&movie.title);
                if !terms.iter().all(|term| term.matches(&words)) {
                    return None;
                }
                let exact = bare_title(&movie.title) == wanted
                    || movie.title.to_lowercase() == wanted;
                let avg = self
                    .get_movie_stats(movie_id)
                    .map(|s| s.avg_rating)
                    .unwrap_or(0.0);
                Some((exact, avg, movie_id))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                .then_with(|| a.2.cmp(&b.2))
        });

        let total = hits.len();
        hits.truncate(limit);
        TitleSearch {
            total,
            movie_ids: hits.into_iter().map(|(_, _, id)| id).collect(),
        }
    }
}
