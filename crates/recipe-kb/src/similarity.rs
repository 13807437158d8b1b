//! Vector similarity scoring and deterministic top-K ranking

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::data::{CoreError, Embedding, RecipeId};

/// How query and stored vectors are compared. Higher scores are always closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity in `[-1, 1]`; a zero-norm vector scores 0.
    #[default]
    Cosine,
    /// `1 / (1 + euclidean distance)`, in `(0, 1]`.
    Euclidean,
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Cosine => write!(f, "cosine"),
            SimilarityMetric::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "euclidean" | "l2" => Ok(SimilarityMetric::Euclidean),
            other => Err(CoreError::ConfigError(format!("Unknown similarity metric: {}", other))),
        }
    }
}

impl SimilarityMetric {
    /// Scores `a` against `b`. Both slices must have the same length.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Scores every candidate against `query` and keeps the best `k`.
///
/// Ordering is by score descending, then recipe id ascending, so equal scores always
/// come back in the same order. Candidates whose dimension differs from the query fail
/// the whole ranking.
pub fn rank_top_k<'a, I>(
    query: &[f32],
    candidates: I,
    k: usize,
    metric: SimilarityMetric,
) -> Result<Vec<(RecipeId, f32)>, CoreError>
where
    I: IntoIterator<Item = &'a Embedding>,
{
    let mut scored = Vec::new();
    for embedding in candidates {
        if embedding.dimension() != query.len() {
            return Err(CoreError::QueryError(format!(
                "query has dimension {} but recipe {} has dimension {}",
                query.len(),
                embedding.recipe_id,
                embedding.dimension()
            )));
        }
        let score = metric.score(query, &embedding.vector);
        // NaN sorts as lowest
        let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
        scored.push((embedding.recipe_id, score));
    }

    scored.sort_by(|(id_a, score_a), (id_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
    scored.truncate(k);
    Ok(scored)
}
