//! Parser for MovieLens data files.
//!
//! Handles the three `::`-separated `.dat` files:
//! - users.dat: userId::gender::age::occupation::zipcode
//! - movies.dat: movieId::title::genres
//! - ratings.dat: userId::movieId::rating::timestamp

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

/// Read a file encoded as ISO-8859-1 (Latin-1) into lines.
///
/// Every Latin-1 byte maps directly onto the Unicode code point of the
/// same value, so the conversion can't fail.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// One non-empty line of a `.dat` file, split into its fields
struct Record<'a> {
    file: &'static str,
    line: usize,
    fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    fn split(file: &'static str, line: usize, text: &'a str, expected: usize) -> Result<Self> {
        let fields: Vec<&str> = text.split("::").collect();
        if fields.len() < expected {
            return Err(DataLoadError::FieldCountMismatch {
                file: file.to_string(),
                expected,
                found: fields.len(),
                line,
            });
        }
        Ok(Self { file, line, fields })
    }

    fn text(&self, idx: usize) -> &'a str {
        self.fields[idx]
    }

    /// Parse field `idx` into any `FromStr` type, naming it in the error
    fn parse<T>(&self, idx: usize, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.fields[idx]
            .trim()
            .parse()
            .map_err(|e| DataLoadError::ParseError {
                file: self.file.to_string(),
                line: self.line,
                reason: format!("Invalid {}: {}", name, e),
            })
    }
}

/// Iterate the non-empty lines of a file as (1-based line number, text)
fn records(lines: &[String]) -> impl Iterator<Item = (usize, &str)> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_gender(s: &str) -> Result<Gender> {
    match s {
        "M" => Ok(Gender::Male),
        "F" => Ok(Gender::Female),
        _ => Err(DataLoadError::InvalidValue {
            field: "gender".to_string(),
            value: s.to_string(),
        }),
    }
}

fn parse_age_group(s: &str) -> Result<AgeGroup> {
    match s {
        "1" => Ok(AgeGroup::Under18),
        "18" => Ok(AgeGroup::Age18To24),
        "25" => Ok(AgeGroup::Age25To34),
        "35" => Ok(AgeGroup::Age35To44),
        "45" => Ok(AgeGroup::Age45To49),
        "50" => Ok(AgeGroup::Age50To55),
        "56" => Ok(AgeGroup::Age56Plus),
        _ => Err(DataLoadError::InvalidValue {
            field: "age".to_string(),
            value: s.to_string(),
        }),
    }
}

fn parse_occupation(s: &str) -> Result<Occupation> {
    const OCCUPATIONS: [Occupation; 21] = [
        Occupation::Other,
        Occupation::Academic,
        Occupation::Artist,
        Occupation::Clerical,
        Occupation::CollegeStudent,
        Occupation::CustomerService,
        Occupation::Doctor,
        Occupation::Executive,
        Occupation::Farmer,
        Occupation::Homemaker,
        Occupation::K12Student,
        Occupation::Lawyer,
        Occupation::Programmer,
        Occupation::Retired,
        Occupation::Sales,
        Occupation::Scientist,
        Occupation::SelfEmployed,
        Occupation::Technician,
        Occupation::Tradesman,
        Occupation::Unemployed,
        Occupation::Writer,
    ];

    s.parse::<usize>()
        .ok()
        .and_then(|code| OCCUPATIONS.get(code).copied())
        .ok_or_else(|| DataLoadError::InvalidValue {
            field: "occupation".to_string(),
            value: s.to_string(),
        })
}

/// Parse the users.dat file
///
/// Format: userId::gender::age::occupation::zipcode
pub fn parse_users(path: &Path) -> Result<Vec<User>> {
    let lines = read_lines_latin1(path)?;
    let mut users = Vec::new();

    for (line_no, text) in records(&lines) {
        let record = Record::split("users.dat", line_no, text, 5)?;
        users.push(User {
            id: record.parse(0, "userId")?,
            name: None,
            demographics: Some(Demographics {
                gender: parse_gender(record.text(1))?,
                age: parse_age_group(record.text(2))?,
                occupation: parse_occupation(record.text(3))?,
                zipcode: record.text(4).to_string(),
            }),
        });
    }

    Ok(users)
}

/// Parse the movies.dat file
///
/// Format: movieId::title::genres
///
/// The title usually ends with the release year: "Toy Story (1995)".
/// Genres are pipe-separated: "Animation|Children's|Comedy"
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let lines = read_lines_latin1(path)?;
    let mut movies = Vec::new();

    for (line_no, text) in records(&lines) {
        let record = Record::split("movies.dat", line_no, text, 3)?;
        let title = record.text(1);
        movies.push(Movie {
            id: record.parse(0, "movieId")?,
            title: title.to_string(),
            year: extract_year_from_title(title),
            genres: parse_genres(record.text(2))?,
        });
    }

    Ok(movies)
}

/// Parse the ratings.dat file
///
/// Format: userId::movieId::rating::timestamp
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let lines = read_lines_latin1(path)?;
    let mut ratings = Vec::new();

    for (line_no, text) in records(&lines) {
        let record = Record::split("ratings.dat", line_no, text, 4)?;
        ratings.push(Rating {
            user_id: record.parse(0, "userId")?,
            movie_id: record.parse(1, "movieId")?,
            rating: record.parse(2, "rating")?,
            timestamp: record.parse(3, "timestamp")?,
        });
    }

    Ok(ratings)
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        return title[start + 1..end].parse::<u16>().ok();
    }
    None
}

/// Parse pipe-separated genres
///
/// Example: "Action|Adventure|Sci-Fi" -> vec![Genre::Action, Genre::Adventure, Genre::SciFi]
fn parse_genres(s: &str) -> Result<Vec<Genre>> {
    s.split('|')
        .filter(|g| !g.is_empty())
        .map(str::parse::<Genre>)
        .collect()
}
