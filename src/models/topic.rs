// src/models/topic.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'topics' table: an optional sub-categorization of
/// questions within one subject.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new topic under a subject.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    pub subject_id: i64,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
}
