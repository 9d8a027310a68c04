// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{exam_type::ExamType, subject::Subject, topic::Topic},
};

/// Lists all exam types (e.g., WAEC, JAMB).
pub async fn list_exam_types(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let exam_types = sqlx::query_as::<_, ExamType>(
        "SELECT id, name, created_at FROM exam_types ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exam types: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(exam_types))
}

/// Lists all subjects.
pub async fn list_subjects(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let subjects =
        sqlx::query_as::<_, Subject>("SELECT id, name, created_at FROM subjects ORDER BY name")
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list subjects: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    Ok(Json(subjects))
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub subject_id: i64,
}

/// Lists the topics that belong to one subject.
pub async fn list_topics(
    State(pool): State<PgPool>,
    Query(query): Query<TopicQuery>,
) -> Result<impl IntoResponse, AppError> {
    let topics = sqlx::query_as::<_, Topic>(
        "SELECT id, subject_id, name, created_at FROM topics WHERE subject_id = $1 ORDER BY name",
    )
    .bind(query.subject_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list topics: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(topics))
}
