// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub question_text: String,

    /// Worked explanation of the correct answer.
    pub explanation: Option<String>,

    pub exam_type_id: i64,
    pub subject_id: i64,
    pub topic_id: Option<i64>,

    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    /// Original examination year, when known.
    pub year: Option<i32>,

    /// Moderation status: 'pending', 'approved' or 'rejected'.
    /// Bulk-imported questions always start as 'pending'.
    pub status: String,

    pub created_by: i64,
    pub is_active: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'question_options' table. Each row is one answer option
/// (A-F) owned by exactly one question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub label: String,
    pub option_text: String,
    pub is_correct: bool,
    pub sort_order: i32,
}

/// DTO for sending a question to practice clients (hides the correct flag).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub difficulty: String,
    pub year: Option<i32>,
    pub options: Vec<PublicOption>,
}

/// DTO for one answer option as shown to practice clients.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicOption {
    #[serde(skip)]
    pub question_id: i64,
    pub label: String,
    pub option_text: String,
    pub sort_order: i32,
}

/// DTO for one answer option when authoring a question.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 1, message = "Option label must be a single letter."))]
    pub label: String,
    #[validate(length(min = 1, max = 1000))]
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question through the admin API.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    pub exam_type_id: i64,
    pub subject_id: i64,
    pub topic_id: Option<i64>,
    pub difficulty: Option<String>,
    pub year: Option<i32>,
    pub status: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Vec<CreateOptionRequest>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub question_text: Option<String>,
    pub explanation: Option<String>,
    pub exam_type_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub difficulty: Option<String>,
    pub year: Option<i32>,
    pub status: Option<String>,
    pub is_active: Option<bool>,
    /// When present, the full option set is replaced atomically.
    pub options: Option<Vec<CreateOptionRequest>>,
}

fn validate_options(options: &[CreateOptionRequest]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    let correct = options.iter().filter(|o| o.is_correct).count();
    if correct != 1 {
        return Err(validator::ValidationError::new("exactly_one_correct_option"));
    }
    for opt in options {
        if !matches!(opt.label.as_str(), "A" | "B" | "C" | "D" | "E" | "F") {
            return Err(validator::ValidationError::new("label_out_of_range"));
        }
    }
    Ok(())
}
