// src/handlers/practice.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        practice_record::{LeaderboardEntry, SubmitPracticeRequest},
        question::{PublicOption, PublicQuestion},
    },
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct GeneratePaperQuery {
    pub exam_type_id: i64,
    pub subject_id: Option<i64>,
    pub count: Option<i64>,
}

/// Bare question row as selected for a paper, before options are attached.
#[derive(sqlx::FromRow)]
struct PaperQuestionRow {
    id: i64,
    question_text: String,
    difficulty: String,
    year: Option<i32>,
}

/// Generates a random practice paper.
///
/// Selects random questions for the requested exam type (optionally
/// narrowed to one subject). Only approved, active questions are served:
/// bulk-imported questions sit in 'pending' until a moderator promotes
/// them. Correct-answer flags are stripped from the options.
pub async fn generate_paper(
    State(pool): State<PgPool>,
    Query(query): Query<GeneratePaperQuery>,
) -> Result<impl IntoResponse, AppError> {
    let count = query.count.unwrap_or(10).clamp(1, 50);

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, question_text, difficulty, year \
         FROM questions \
         WHERE status = 'approved' AND is_active = TRUE AND exam_type_id = ",
    );
    builder.push_bind(query.exam_type_id);
    if let Some(subject_id) = query.subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id);
    }
    builder.push(" ORDER BY RANDOM() LIMIT ");
    builder.push_bind(count);

    let questions: Vec<PaperQuestionRow> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch paper questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if questions.is_empty() {
        return Ok(Json(Vec::<PublicQuestion>::new()));
    }

    // Second query pulls the options for every selected question at once.
    let mut option_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT question_id, label, option_text, sort_order \
         FROM question_options WHERE question_id IN (",
    );
    let mut separated = option_builder.separated(",");
    for question in &questions {
        separated.push_bind(question.id);
    }
    separated.push_unseparated(")");
    option_builder.push(" ORDER BY question_id, sort_order");

    let options: Vec<PublicOption> = option_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch paper options: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let mut options_by_question: HashMap<i64, Vec<PublicOption>> = HashMap::new();
    for option in options {
        options_by_question
            .entry(option.question_id)
            .or_default()
            .push(option);
    }

    let paper: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| PublicQuestion {
            options: options_by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            question_text: q.question_text,
            difficulty: q.difficulty,
            year: q.year,
        })
        .collect();

    Ok(Json(paper))
}

/// Helper struct for fetching correct labels from the database.
#[derive(sqlx::FromRow)]
struct CorrectLabel {
    question_id: i64,
    label: String,
}

/// Submits a user's practice answers and calculates the score.
///
/// * Validates the token and extracts User ID.
/// * Compares the submitted labels with the correct options.
/// * Calculates score (10 points per correct answer).
/// * Saves or updates the result (Upsert) in `practice_records`.
pub async fn submit_paper(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitPracticeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question_ids: Vec<i64> = req.answers.keys().cloned().collect();

    if question_ids.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    // Use QueryBuilder for dynamic IN clause
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT question_id, label \
         FROM question_options \
         WHERE is_correct = TRUE AND question_id IN (",
    );

    let mut separated = query_builder.separated(",");
    for id in &question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let correct_labels: Vec<CorrectLabel> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let correct_map: HashMap<i64, String> = correct_labels
        .into_iter()
        .map(|c| (c.question_id, c.label))
        .collect();

    let mut total_score: i64 = 0;
    let mut correct_count = 0;

    for (question_id, user_answer) in &req.answers {
        if let Some(correct) = correct_map.get(question_id) {
            if user_answer.trim().eq_ignore_ascii_case(correct) {
                total_score += 10;
                correct_count += 1;
            }
        }
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    // Upsert: keep the highest score if the user retakes the paper
    sqlx::query(
        r#"
        INSERT INTO practice_records (user_id, score)
        VALUES ($1, $2)
        ON CONFLICT(user_id) DO UPDATE SET
            score = CASE WHEN EXCLUDED.score > practice_records.score THEN EXCLUDED.score ELSE practice_records.score END,
            created_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(total_score)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert practice record: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "score": total_score,
        "correct_count": correct_count,
        "total_questions": question_ids.len(),
        "message": "Practice submitted successfully"
    })))
}

/// Retrieves the top 5 high scores from the leaderboard.
pub async fn get_leaderboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT u.username, p.score, p.created_at
        FROM practice_records p
        JOIN users u ON p.user_id = u.id
        ORDER BY p.score DESC
        LIMIT 5
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}
