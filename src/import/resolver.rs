// src/import/resolver.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;

/// Read-only lookups against the reference-data directories.
///
/// Each method applies the same two-stage strategy: a numeric value is
/// treated as an identifier and must exist; anything else is matched
/// case-insensitively against the exact name. `None` means unresolved;
/// `Err` is reserved for infrastructure failures.
///
/// Injected into the importer so row resolution is testable against
/// in-memory directories.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve_exam_type(&self, raw: &str) -> Result<Option<i64>, AppError>;

    async fn resolve_subject(&self, raw: &str) -> Result<Option<i64>, AppError>;

    /// Topic lookups are scoped: a topic only resolves if it belongs to
    /// `subject_id`.
    async fn resolve_topic(&self, raw: &str, subject_id: i64) -> Result<Option<i64>, AppError>;
}

/// Postgres-backed resolver used by the import endpoint.
pub struct PgReferenceResolver {
    pool: PgPool,
}

impl PgReferenceResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceResolver for PgReferenceResolver {
    async fn resolve_exam_type(&self, raw: &str) -> Result<Option<i64>, AppError> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            let found = sqlx::query_scalar::<_, i64>("SELECT id FROM exam_types WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(found);
        }

        let found =
            sqlx::query_scalar::<_, i64>("SELECT id FROM exam_types WHERE LOWER(name) = LOWER($1)")
                .bind(raw)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found)
    }

    async fn resolve_subject(&self, raw: &str) -> Result<Option<i64>, AppError> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            let found = sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(found);
        }

        let found =
            sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE LOWER(name) = LOWER($1)")
                .bind(raw)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found)
    }

    async fn resolve_topic(&self, raw: &str, subject_id: i64) -> Result<Option<i64>, AppError> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            let found = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM topics WHERE id = $1 AND subject_id = $2",
            )
            .bind(id)
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await?;
            return Ok(found);
        }

        let found = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM topics WHERE LOWER(name) = LOWER($1) AND subject_id = $2",
        )
        .bind(raw)
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }
}
