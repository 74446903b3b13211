//! Store Contracts
//!
//! Two shared mutable collaborators sit behind these traits: the similarity
//! store (documents with embeddings, queried by nearest neighbor) and the
//! session store (a child's durable lesson history). Backends must serialize
//! concurrent writes to the same key; last-write-wins is acceptable for the
//! feedback overwrite, and writes to distinct ids must not corrupt each other.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::session::LessonSession;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("embedding dimension mismatch: store holds {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// One similarity-search hit, ranked by cosine similarity (higher is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: String,
    pub metadata: Value,
    pub score: f32,
}

/// One record as stored, returned by metadata-filtered lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    pub metadata: Value,
}

/// A persistent collection of (document, metadata, embedding) triples.
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Inserts or replaces the record with this id. Idempotent by id; a
    /// re-upsert also refreshes the record's recency for [`Self::latest_by_filter`].
    async fn upsert(
        &self,
        id: &str,
        document: &str,
        embedding: &[f32],
        metadata: Value,
    ) -> Result<(), StoreError>;

    /// Returns up to `k` documents nearest to `embedding`, closest first.
    /// An empty collection yields an empty list.
    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError>;

    /// Returns the most recently upserted record whose metadata contains every
    /// key/value pair of `filter`, or `None`.
    async fn latest_by_filter(&self, filter: &Value) -> Result<Option<StoredRecord>, StoreError>;
}

/// Durable record of a child's lessons, keyed by child and lesson id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &LessonSession) -> Result<(), StoreError>;

    async fn get(
        &self,
        child_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<LessonSession>, StoreError>;

    /// Sets (or overwrites) the feedback on an existing session. Returns
    /// `false` when no session matches (an unmatched submission).
    async fn attach_feedback(
        &self,
        child_id: &str,
        lesson_id: Uuid,
        feedback: &str,
    ) -> Result<bool, StoreError>;

    /// All of a child's sessions, newest first. Each entry carries the lesson
    /// content, the assessment materials, and the feedback when one exists.
    async fn history(&self, child_id: &str) -> Result<Vec<LessonSession>, StoreError>;
}

/// Cosine similarity between two equal-length vectors.
///
/// A zero-magnitude vector has no direction, so its similarity to anything
/// is reported as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.5, 0.2];
        assert_relative_eq!(cosine_similarity(&v, &v), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_relative_eq!(
            cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        assert_relative_eq!(
            cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]),
            -1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn zero_vector_has_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
