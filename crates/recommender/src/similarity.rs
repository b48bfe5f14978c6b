//! User-to-user similarity over co-rated movies.
//!
//! Every metric takes the (target score, candidate score) pairs of the
//! movies both users rated and returns a non-negative weight. All of them
//! are symmetric: swapping the two users gives the same value.

use data_loader::{MAX_RATING, MIN_RATING};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimilarityMetric {
    /// `1 - mean |a - b| / rating span`, in `[0, 1]`
    #[default]
    Agreement,
    /// Pearson correlation over shared movies; negative or undefined
    /// correlations weigh 0
    Pearson,
    /// Number of shared movies
    Overlap,
}

impl SimilarityMetric {
    pub fn similarity(self, shared: &[(f32, f32)]) -> f64 {
        if shared.is_empty() {
            return 0.0;
        }
        match self {
            SimilarityMetric::Agreement => agreement(shared),
            SimilarityMetric::Pearson => pearson(shared),
            SimilarityMetric::Overlap => shared.len() as f64,
        }
    }
}

fn agreement(shared: &[(f32, f32)]) -> f64 {
    let span = f64::from(MAX_RATING - MIN_RATING);
    let total: f64 = shared
        .iter()
        .map(|&(a, b)| (f64::from(a) - f64::from(b)).abs())
        .sum();
    let mean_abs = total / shared.len() as f64;
    (1.0 - mean_abs / span).clamp(0.0, 1.0)
}

fn pearson(shared: &[(f32, f32)]) -> f64 {
    if shared.len() < 2 {
        return 0.0;
    }
    let n = shared.len() as f64;
    let mean_a = shared.iter().map(|&(a, _)| f64::from(a)).sum::<f64>() / n;
    let mean_b = shared.iter().map(|&(_, b)| f64::from(b)).sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for &(a, b) in shared {
        let da = f64::from(a) - mean_a;
        let db = f64::from(b) - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(0.0, 1.0)
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimilarityMetric::Agreement => "agreement",
            SimilarityMetric::Pearson => "pearson",
            SimilarityMetric::Overlap => "overlap",
        };
        f.write_str(name)
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agreement" => Ok(SimilarityMetric::Agreement),
            "pearson" => Ok(SimilarityMetric::Pearson),
            "overlap" => Ok(SimilarityMetric::Overlap),
            other => Err(format!(
                "unknown similarity metric '{}' (expected agreement, pearson or overlap)",
                other
            )),
        }
    }
}
