use std::sync::Arc;

use crate::store::{EmbeddingStore, StoreError, validate_vector};

/// Compute cosine similarity between two vectors of equal dimension.
///
/// If either vector has zero magnitude the similarity is undefined; this
/// returns `f32::NEG_INFINITY` so such pairs rank below every threshold
/// (including -1) instead of raising a division error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::NEG_INFINITY;
    }
    dot / (norm_a * norm_b)
}

/// Exhaustive cosine-similarity search over an embedding store.
///
/// Every query re-reads the full store and scans it in O(N·D). That is the
/// intended design for small-to-moderate corpora; there is no index.
pub struct SimilaritySearch {
    store: Arc<dyn EmbeddingStore>,
    threshold: f32,
    limit: usize,
}

impl SimilaritySearch {
    /// Build a searcher with a fixed similarity threshold and result limit.
    ///
    /// The threshold must lie within the cosine range [-1, 1].
    pub fn new(store: Arc<dyn EmbeddingStore>, threshold: f32, limit: usize) -> Result<Self, String> {
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(format!(
                "similarity threshold must be within [-1, 1], got {threshold}"
            ));
        }
        Ok(Self {
            store,
            threshold,
            limit,
        })
    }

    /// Return the payloads most similar to `query`, best first.
    ///
    /// Stored vectors whose dimension differs from the query are skipped with
    /// a warning; they never fail the query. Results are filtered to
    /// similarity >= threshold and truncated to the configured limit. Ties
    /// keep insertion order.
    pub fn search(&self, query: &[f32]) -> Result<Vec<String>, StoreError> {
        validate_vector(query)?;

        let entries = self.store.all_embeddings()?;

        let mut scored: Vec<(f32, String)> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.vector.len() != query.len() {
                eprintln!(
                    "Warning: skipping stored vector of dimension {} (query dimension is {})",
                    entry.vector.len(),
                    query.len()
                );
                continue;
            }
            scored.push((cosine_similarity(query, &entry.vector), entry.payload));
        }

        // Stable sort, descending by similarity: equal scores keep scan
        // order, which is insertion order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .filter(|(score, _)| *score >= self.threshold)
            .map(|(_, payload)| payload)
            .take(self.limit)
            .collect())
    }
}
