//! Data Access Layer
//!
//! Postgres-backed implementations of the core store contracts, plus a thin
//! pool wrapper for migrations and shutdown. Queries are bound at runtime
//! against the schema created by the embedded migrations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use sprout_core::session::LessonSession;
use sprout_core::store::{
    ScoredDocument, SessionStore, SimilarityStore, StoreError, StoredRecord, cosine_similarity,
};

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Flushes and closes all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    lesson_id: Uuid,
    child_id: String,
    curriculum: String,
    lesson: String,
    materials: String,
    feedback: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for LessonSession {
    fn from(row: SessionRow) -> Self {
        Self {
            lesson_id: row.lesson_id,
            child_id: row.child_id,
            curriculum: row.curriculum,
            lesson: row.lesson,
            materials: row.materials,
            feedback: row.feedback,
            created_at: row.created_at,
        }
    }
}

/// `SessionStore` backed by the `lesson_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: &LessonSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO lesson_sessions
                (lesson_id, child_id, curriculum, lesson, materials, feedback, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.lesson_id)
        .bind(&session.child_id)
        .bind(&session.curriculum)
        .bind(&session.lesson)
        .bind(&session.materials)
        .bind(&session.feedback)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(
        &self,
        child_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<LessonSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT lesson_id, child_id, curriculum, lesson, materials, feedback, created_at
            FROM lesson_sessions
            WHERE child_id = $1 AND lesson_id = $2
            "#,
        )
        .bind(child_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(LessonSession::from))
    }

    async fn attach_feedback(
        &self,
        child_id: &str,
        lesson_id: Uuid,
        feedback: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE lesson_sessions SET feedback = $3 WHERE child_id = $1 AND lesson_id = $2",
        )
        .bind(child_id)
        .bind(lesson_id)
        .bind(feedback)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn history(&self, child_id: &str) -> Result<Vec<LessonSession>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT lesson_id, child_id, curriculum, lesson, materials, feedback, created_at
            FROM lesson_sessions
            WHERE child_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(LessonSession::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SimilarityRow {
    id: String,
    document: String,
    embedding: Vec<f32>,
    metadata: Value,
}

/// `SimilarityStore` backed by the `similarity_records` table.
///
/// Candidate rows are loaded and ranked by cosine similarity in process; the
/// collection stays small enough (reference documents plus one record per
/// submitted assessment) that a linear scan is adequate.
#[derive(Clone)]
pub struct PgSimilarityStore {
    pool: PgPool,
}

impl PgSimilarityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SimilarityStore for PgSimilarityStore {
    async fn upsert(
        &self,
        id: &str,
        document: &str,
        embedding: &[f32],
        metadata: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO similarity_records (id, document, embedding, metadata, upserted_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (id) DO UPDATE SET
                document = EXCLUDED.document,
                embedding = EXCLUDED.embedding,
                metadata = EXCLUDED.metadata,
                upserted_at = now()
            "#,
        )
        .bind(id)
        .bind(document)
        .bind(embedding.to_vec())
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let rows = sqlx::query_as::<_, SimilarityRow>(
            "SELECT id, document, embedding, metadata FROM similarity_records",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        if let Some(first) = rows.first() {
            if first.embedding.len() != embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected: first.embedding.len(),
                    got: embedding.len(),
                });
            }
        }

        let mut scored: Vec<ScoredDocument> = rows
            .into_iter()
            .map(|row| ScoredDocument {
                score: cosine_similarity(&row.embedding, embedding),
                document: row.document,
                metadata: row.metadata,
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
        let row = sqlx::query_as::<_, SimilarityRow>(
            r#"
            SELECT id, document, embedding, metadata
            FROM similarity_records
            WHERE metadata @> $1
            ORDER BY upserted_at DESC
            LIMIT 1
            "#,
        )
        .bind(filter.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(|r| StoredRecord {
            id: r.id,
            document: r.document,
            metadata: r.metadata,
        }))
    }
}
