//! In-memory store implementations.
//!
//! Reference backends for tests and local development. Records live in a
//! `Vec` behind a `tokio::sync::RwLock`, so insertion order doubles as the
//! recency order the contracts require. Data is lost when the value drops.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ScoredDocument, SessionStore, SimilarityStore, StoreError, StoredRecord, cosine_similarity};
use crate::session::LessonSession;

#[derive(Debug, Clone)]
struct VectorRecord {
    id: String,
    document: String,
    embedding: Vec<f32>,
    metadata: Value,
}

/// `SimilarityStore` backed by a linear scan with cosine ranking.
#[derive(Debug, Default)]
pub struct InMemorySimilarityStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemorySimilarityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_dimension(records: &[VectorRecord], embedding: &[f32]) -> Result<(), StoreError> {
    match records.first() {
        Some(first) if first.embedding.len() != embedding.len() => {
            Err(StoreError::DimensionMismatch {
                expected: first.embedding.len(),
                got: embedding.len(),
            })
        }
        _ => Ok(()),
    }
}

/// True when `metadata` contains every key/value pair of `filter`.
fn matches_filter(metadata: &Value, filter: &Value) -> bool {
    match (metadata.as_object(), filter.as_object()) {
        (Some(meta), Some(wanted)) => wanted.iter().all(|(k, v)| meta.get(k) == Some(v)),
        _ => false,
    }
}

#[async_trait]
impl SimilarityStore for InMemorySimilarityStore {
    async fn upsert(
        &self,
        id: &str,
        document: &str,
        embedding: &[f32],
        metadata: Value,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        check_dimension(&records, embedding)?;
        // Re-upserting moves the record to the tail, refreshing its recency.
        records.retain(|r| r.id != id);
        records.push(VectorRecord {
            id: id.to_string(),
            document: document.to_string(),
            embedding: embedding.to_vec(),
            metadata,
        });
        Ok(())
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let records = self.records.read().await;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        check_dimension(&records, embedding)?;

        let mut scored: Vec<ScoredDocument> = records
            .iter()
            .map(|r| ScoredDocument {
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                score: cosine_similarity(&r.embedding, embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn latest_by_filter(&self, filter: &Value) -> Result<Option<StoredRecord>, StoreError> {
        if !filter.is_object() {
            return Err(StoreError::Backend(
                "metadata filter must be a JSON object".to_string(),
            ));
        }
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .find(|r| matches_filter(&r.metadata, filter))
            .map(|r| StoredRecord {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
            }))
    }
}

/// `SessionStore` backed by an insertion-ordered `Vec`.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<Vec<LessonSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &LessonSession) -> Result<(), StoreError> {
        self.sessions.write().await.push(session.clone());
        Ok(())
    }

    async fn get(
        &self,
        child_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<LessonSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .find(|s| s.child_id == child_id && s.lesson_id == lesson_id)
            .cloned())
    }

    async fn attach_feedback(
        &self,
        child_id: &str,
        lesson_id: Uuid,
        feedback: &str,
    ) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions
            .iter_mut()
            .find(|s| s.child_id == child_id && s.lesson_id == lesson_id)
        {
            Some(session) => {
                session.feedback = Some(feedback.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn history(&self, child_id: &str) -> Result<Vec<LessonSession>, StoreError> {
        let sessions = self.sessions.read().await;
        // Insertion order is creation order; newest first.
        Ok(sessions
            .iter()
            .filter(|s| s.child_id == child_id)
            .rev()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(child_id: &str) -> LessonSession {
        LessonSession::new(
            Uuid::new_v4(),
            child_id.to_string(),
            "Volcanoes".to_string(),
            "A lesson about volcanoes.".to_string(),
            "1. Magma".to_string(),
        )
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_similarity() {
        let store = InMemorySimilarityStore::new();
        store
            .upsert("a", "doc a", &[1.0, 0.0], json!({}))
            .await
            .unwrap();
        store
            .upsert("b", "doc b", &[0.0, 1.0], json!({}))
            .await
            .unwrap();
        store
            .upsert("c", "doc c", &[0.9, 0.1], json!({}))
            .await
            .unwrap();

        let hits = store.query_nearest(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document, "doc a");
        assert_eq!(hits[1].document, "doc c");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn query_on_empty_store_returns_empty() {
        let store = InMemorySimilarityStore::new();
        let hits = store.query_nearest(&[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_id() {
        let store = InMemorySimilarityStore::new();
        store
            .upsert("a", "first", &[1.0, 0.0], json!({"v": 1}))
            .await
            .unwrap();
        store
            .upsert("a", "second", &[0.5, 0.5], json!({"v": 2}))
            .await
            .unwrap();

        let hits = store.query_nearest(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, "second");
        assert_eq!(hits[0].metadata, json!({"v": 2}));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = InMemorySimilarityStore::new();
        store
            .upsert("a", "doc", &[1.0, 0.0], json!({}))
            .await
            .unwrap();

        let err = store
            .upsert("b", "doc", &[1.0, 0.0, 0.0], json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 2, got: 3 }
        ));

        let err = store.query_nearest(&[1.0], 5).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 2, got: 1 }
        ));
    }

    #[tokio::test]
    async fn latest_by_filter_prefers_most_recent_upsert() {
        let store = InMemorySimilarityStore::new();
        store
            .upsert("a", "older", &[1.0], json!({"student_id": "c1", "type": "assessment"}))
            .await
            .unwrap();
        store
            .upsert("b", "newer", &[0.5], json!({"student_id": "c1", "type": "assessment"}))
            .await
            .unwrap();
        store
            .upsert("x", "other child", &[0.2], json!({"student_id": "c2", "type": "assessment"}))
            .await
            .unwrap();

        let record = store
            .latest_by_filter(&json!({"student_id": "c1"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.document, "newer");

        // Re-upserting "a" makes it the latest again.
        store
            .upsert("a", "refreshed", &[1.0], json!({"student_id": "c1", "type": "assessment"}))
            .await
            .unwrap();
        let record = store
            .latest_by_filter(&json!({"student_id": "c1"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.document, "refreshed");
    }

    #[tokio::test]
    async fn latest_by_filter_without_match_is_none() {
        let store = InMemorySimilarityStore::new();
        store
            .upsert("a", "doc", &[1.0], json!({"student_id": "c1"}))
            .await
            .unwrap();
        let record = store
            .latest_by_filter(&json!({"student_id": "missing"}))
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_scoped_to_child() {
        let store = InMemorySessionStore::new();
        let first = session("c1");
        let second = session("c1");
        let other = session("c2");
        store.create(&first).await.unwrap();
        store.create(&other).await.unwrap();
        store.create(&second).await.unwrap();

        let history = store.history("c1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].lesson_id, second.lesson_id);
        assert_eq!(history[1].lesson_id, first.lesson_id);
    }

    #[tokio::test]
    async fn attach_feedback_overwrites_and_reports_match() {
        let store = InMemorySessionStore::new();
        let lesson = session("c1");
        store.create(&lesson).await.unwrap();

        assert!(
            store
                .attach_feedback("c1", lesson.lesson_id, "good work")
                .await
                .unwrap()
        );
        assert!(
            store
                .attach_feedback("c1", lesson.lesson_id, "even better")
                .await
                .unwrap()
        );

        let stored = store.get("c1", lesson.lesson_id).await.unwrap().unwrap();
        assert_eq!(stored.feedback.as_deref(), Some("even better"));

        assert!(
            !store
                .attach_feedback("c1", Uuid::new_v4(), "nobody home")
                .await
                .unwrap()
        );
    }
}
