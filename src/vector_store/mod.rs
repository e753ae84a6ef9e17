//! Vector index abstraction for medrag.
//!
//! Retrieval goes through the [`VectorStore`] trait so the request path does
//! not depend on how vectors are stored. The shipped backend is an exact
//! flat index loaded from disk at startup.

mod flat;

pub use flat::FlatVectorStore;

use crate::config::DistanceMetric;
use crate::error::Result;
use async_trait::async_trait;

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Row position in the index.
    pub row: usize,
    /// Document id mapped to that row.
    pub doc_id: String,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector index implementations.
///
/// Results are ordered by descending score; equal scores keep ascending
/// row order so identical queries always see the same ranking.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search for the `limit` nearest rows.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Document ids in row order.
    fn ids(&self) -> &[String];

    /// Vector dimensions.
    fn dimensions(&self) -> usize;

    /// Number of indexed rows.
    fn len(&self) -> usize {
        self.ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Compute Euclidean distance between two vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Score a stored vector against a query; higher is closer for every metric.
pub fn score(metric: DistanceMetric, query: &[f32], stored: &[f32]) -> f32 {
    let score = match metric {
        DistanceMetric::Cosine => cosine_similarity(query, stored),
        DistanceMetric::L2 => -l2_distance(query, stored),
    };
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_l2_scores_closer_higher() {
        let q = [0.0, 0.0];
        let near = score(DistanceMetric::L2, &q, &[1.0, 0.0]);
        let far = score(DistanceMetric::L2, &q, &[3.0, 4.0]);
        assert!(near > far);
        assert!((far + 5.0).abs() < 0.001);
    }

    #[test]
    fn test_nan_scores_sink() {
        let s = score(DistanceMetric::Cosine, &[f32::NAN, 1.0], &[1.0, 1.0]);
        assert_eq!(s, f32::NEG_INFINITY);
    }
}
