// src/models/exam_type.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exam_types' table: a named examination board/category
/// questions are tagged with (e.g., WAEC, JAMB).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamType {
    pub id: i64,
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new exam type.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamTypeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}
