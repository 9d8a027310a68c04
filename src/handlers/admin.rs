// src/handlers/admin.rs

use std::path::Path;

use axum::{
    Json,
    extract::{Extension, Multipart, Path as UrlPath, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    import::{
        ImportOptions, QuestionsImporter, open_row_source, resolver::PgReferenceResolver,
        store::PgQuestionStore,
    },
    models::{
        exam_type::CreateExamTypeRequest,
        question::{CreateQuestionRequest, Question, QuestionOption, UpdateQuestionRequest},
        subject::CreateSubjectRequest,
        topic::CreateTopicRequest,
        user::User,
    },
    utils::{hash::hash_password, html::clean_html, jwt::Claims},
};

const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];
const STATUSES: [&str; 3] = ["pending", "approved", "rejected"];

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// DTO for Admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    pub role: String, // 'user' or 'admin'
}

/// Creates a new user with specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !matches!(payload.role.as_str(), "user" | "admin") {
        return Err(AppError::BadRequest(
            "Role must be 'user' or 'admin'".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.password)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (username, password, role)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    UrlPath(id): UrlPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Prevent self-deletion
    let current_user_id = claims.sub.parse::<i64>().unwrap_or(0);
    if id == current_user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new exam type.
/// Admin only.
pub async fn create_exam_type(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateExamTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO exam_types (name) VALUES ($1) RETURNING id",
    )
    .bind(payload.name.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Exam type '{}' already exists", payload.name))
        } else {
            tracing::error!("Failed to create exam type: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes an exam type by ID.
/// Admin only.
pub async fn delete_exam_type(
    State(pool): State<PgPool>,
    UrlPath(id): UrlPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exam_types WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam type: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam type not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new subject.
/// Admin only.
pub async fn create_subject(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>("INSERT INTO subjects (name) VALUES ($1) RETURNING id")
        .bind(payload.name.trim())
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                AppError::Conflict(format!("Subject '{}' already exists", payload.name))
            } else {
                tracing::error!("Failed to create subject: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes a subject by ID.
/// Admin only.
pub async fn delete_subject(
    State(pool): State<PgPool>,
    UrlPath(id): UrlPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete subject: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new topic under a subject.
/// Admin only.
pub async fn create_topic(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    // Subject must exist
    sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE id = $1")
        .bind(payload.subject_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO topics (subject_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(payload.subject_id)
    .bind(payload.name.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Topic '{}' already exists", payload.name))
        } else {
            tracing::error!("Failed to create topic: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes a topic by ID.
/// Admin only.
pub async fn delete_topic(
    State(pool): State<PgPool>,
    UrlPath(id): UrlPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM topics WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete topic: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct QuestionListQuery {
    pub status: Option<String>,
    pub exam_type_id: Option<i64>,
    pub subject_id: Option<i64>,
}

/// Lists questions for moderation, newest first (capped at 100).
/// Admin only.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(query): Query<QuestionListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, question_text, explanation, exam_type_id, subject_id, topic_id, \
         difficulty, year, status, created_by, is_active, created_at \
         FROM questions WHERE TRUE",
    );

    if let Some(status) = &query.status {
        builder.push(" AND status = ");
        builder.push_bind(status.clone());
    }
    if let Some(exam_type_id) = query.exam_type_id {
        builder.push(" AND exam_type_id = ");
        builder.push_bind(exam_type_id);
    }
    if let Some(subject_id) = query.subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id);
    }
    builder.push(" ORDER BY id DESC LIMIT 100");

    let questions: Vec<Question> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(questions))
}

/// Fetches one question together with its options.
/// Admin only.
pub async fn get_question(
    State(pool): State<PgPool>,
    UrlPath(id): UrlPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question_text, explanation, exam_type_id, subject_id, topic_id,
               difficulty, year, status, created_by, is_active, created_at
        FROM questions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT id, question_id, label, option_text, is_correct, sort_order
        FROM question_options
        WHERE question_id = $1
        ORDER BY sort_order
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "question": question,
        "options": options
    })))
}

/// Creates a new question with its options.
/// Admin only. The question and its options are inserted in one
/// transaction.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let difficulty = payload.difficulty.unwrap_or_else(|| "medium".to_string());
    if !DIFFICULTIES.contains(&difficulty.as_str()) {
        return Err(AppError::BadRequest(
            "Difficulty must be easy, medium or hard".to_string(),
        ));
    }

    let status = payload.status.unwrap_or_else(|| "pending".to_string());
    if !STATUSES.contains(&status.as_str()) {
        return Err(AppError::BadRequest(
            "Status must be pending, approved or rejected".to_string(),
        ));
    }

    let created_by = claims.sub.parse::<i64>().unwrap_or(0);

    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions
        (question_text, explanation, exam_type_id, subject_id, topic_id,
         difficulty, year, status, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(clean_html(&payload.question_text))
    .bind(payload.explanation.as_deref().map(clean_html))
    .bind(payload.exam_type_id)
    .bind(payload.subject_id)
    .bind(payload.topic_id)
    .bind(&difficulty)
    .bind(payload.year)
    .bind(&status)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    for (index, option) in payload.options.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO question_options
            (question_id, label, option_text, is_correct, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&option.label)
        .bind(clean_html(&option.option_text))
        .bind(option.is_correct)
        .bind(index as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question option: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a question by ID.
/// Admin only. When `options` is present the full option set is replaced
/// atomically with the field updates.
pub async fn update_question(
    State(pool): State<PgPool>,
    UrlPath(id): UrlPath<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if let Some(difficulty) = &payload.difficulty {
        if !DIFFICULTIES.contains(&difficulty.as_str()) {
            return Err(AppError::BadRequest(
                "Difficulty must be easy, medium or hard".to_string(),
            ));
        }
    }

    if let Some(status) = &payload.status {
        if !STATUSES.contains(&status.as_str()) {
            return Err(AppError::BadRequest(
                "Status must be pending, approved or rejected".to_string(),
            ));
        }
    }

    let has_field_update = payload.question_text.is_some()
        || payload.explanation.is_some()
        || payload.exam_type_id.is_some()
        || payload.subject_id.is_some()
        || payload.topic_id.is_some()
        || payload.difficulty.is_some()
        || payload.year.is_some()
        || payload.status.is_some()
        || payload.is_active.is_some();

    if !has_field_update && payload.options.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut tx = pool.begin().await?;

    if has_field_update {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        if let Some(question_text) = &payload.question_text {
            separated.push("question_text = ");
            separated.push_bind_unseparated(clean_html(question_text));
        }

        if let Some(explanation) = &payload.explanation {
            separated.push("explanation = ");
            separated.push_bind_unseparated(clean_html(explanation));
        }

        if let Some(exam_type_id) = payload.exam_type_id {
            separated.push("exam_type_id = ");
            separated.push_bind_unseparated(exam_type_id);
        }

        if let Some(subject_id) = payload.subject_id {
            separated.push("subject_id = ");
            separated.push_bind_unseparated(subject_id);
        }

        if let Some(topic_id) = payload.topic_id {
            separated.push("topic_id = ");
            separated.push_bind_unseparated(topic_id);
        }

        if let Some(difficulty) = &payload.difficulty {
            separated.push("difficulty = ");
            separated.push_bind_unseparated(difficulty.clone());
        }

        if let Some(year) = payload.year {
            separated.push("year = ");
            separated.push_bind_unseparated(year);
        }

        if let Some(status) = &payload.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status.clone());
        }

        if let Some(is_active) = payload.is_active {
            separated.push("is_active = ");
            separated.push_bind_unseparated(is_active);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    if let Some(options) = &payload.options {
        for option in options {
            if !matches!(option.label.as_str(), "A" | "B" | "C" | "D" | "E" | "F") {
                return Err(AppError::BadRequest(
                    "Option labels must be A through F".to_string(),
                ));
            }
        }
        if options.iter().filter(|o| o.is_correct).count() != 1 {
            return Err(AppError::BadRequest(
                "Exactly one option must be marked correct".to_string(),
            ));
        }

        sqlx::query("DELETE FROM question_options WHERE question_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        for (index, option) in options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO question_options
                (question_id, label, option_text, is_correct, sort_order)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(&option.label)
            .bind(clean_html(&option.option_text))
            .bind(option.is_correct)
            .bind(index as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        }
    }

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a question by ID. Options cascade.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    UrlPath(id): UrlPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-imports questions from an uploaded spreadsheet (CSV/XLS/XLSX).
/// Admin only.
///
/// Multipart fields:
/// * `file` (required) - the spreadsheet,
/// * `exam_type_id`, `subject_id` (optional) - defaults for rows that omit
///   their own reference columns,
/// * `batch_label` (optional) - informational tag for the logs.
///
/// Responds with the import summary: imported/skipped counts plus one
/// error string per failed row. Row failures never fail the request.
pub async fn import_questions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<(String, axum::body::Bytes)> = None;
    let mut default_exam_type_id = None;
    let mut default_subject_id = None;
    let mut batch_label = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some((file_name, data));
            }
            "exam_type_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                default_exam_type_id = Some(text.trim().parse::<i64>().map_err(|_| {
                    AppError::BadRequest("exam_type_id must be numeric".to_string())
                })?);
            }
            "subject_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                default_subject_id = Some(text.trim().parse::<i64>().map_err(|_| {
                    AppError::BadRequest("subject_id must be numeric".to_string())
                })?);
            }
            "batch_label" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.trim().is_empty() {
                    batch_label = Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;

    let extension = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // Spool the upload to disk so the workbook reader can open it by path.
    // The temp file is removed on drop, whatever the import outcome.
    let temp = tempfile::Builder::new()
        .prefix("question-import-")
        .suffix(&format!(".{}", extension))
        .tempfile()?;
    std::fs::write(temp.path(), &data)?;

    let mut source = open_row_source(temp.path())?;

    let created_by = claims.sub.parse::<i64>().unwrap_or(0);
    let importer = QuestionsImporter::new(
        PgReferenceResolver::new(pool.clone()),
        PgQuestionStore::new(pool),
        ImportOptions {
            default_exam_type_id,
            default_subject_id,
            created_by,
            batch_label,
        },
    );

    let summary = importer.run(source.as_mut()).await;

    Ok(Json(summary))
}
