// src/import/store.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::import::importer::Difficulty;

/// A question as produced by the import pipeline, ready to persist.
/// Status and is_active are not carried here: imported questions always
/// enter moderation as 'pending' and active.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub explanation: Option<String>,
    pub exam_type_id: i64,
    pub subject_id: i64,
    pub topic_id: Option<i64>,
    pub difficulty: Difficulty,
    pub year: Option<i32>,
    pub created_by: i64,
}

/// One answer option belonging to a `NewQuestion`.
#[derive(Debug, Clone)]
pub struct NewOption {
    pub label: &'static str,
    pub option_text: String,
    pub is_correct: bool,
    pub sort_order: i32,
}

/// Unit-of-work seam for persisting one imported row.
///
/// The question and all its options commit or roll back as a whole; a
/// failed row must leave no partial records behind.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert_question(
        &self,
        question: &NewQuestion,
        options: &[NewOption],
    ) -> Result<i64, AppError>;
}

/// Postgres-backed store used by the import endpoint.
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn insert_question(
        &self,
        question: &NewQuestion,
        options: &[NewOption],
    ) -> Result<i64, AppError> {
        // Propagating with `?` drops the transaction, which rolls the whole
        // row back.
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions
            (question_text, explanation, exam_type_id, subject_id, topic_id,
             difficulty, year, status, created_by, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, TRUE)
            RETURNING id
            "#,
        )
        .bind(&question.question_text)
        .bind(&question.explanation)
        .bind(question.exam_type_id)
        .bind(question.subject_id)
        .bind(question.topic_id)
        .bind(question.difficulty.as_str())
        .bind(question.year)
        .bind(question.created_by)
        .fetch_one(&mut *tx)
        .await?;

        for option in options {
            sqlx::query(
                r#"
                INSERT INTO question_options
                (question_id, label, option_text, is_correct, sort_order)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(option.label)
            .bind(&option.option_text)
            .bind(option.is_correct)
            .bind(option.sort_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }
}
