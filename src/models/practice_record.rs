// src/models/practice_record.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'practice_records' table.
/// Stores each user's best practice score.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PracticeRecord {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated struct for displaying the leaderboard.
/// Represents a row joined from `users` and `practice_records`.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting a practice attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitPracticeRequest {
    /// User's answers map.
    /// Key: Question ID (i64)
    /// Value: User's selected option label (e.g., "B")
    pub answers: std::collections::HashMap<i64, String>,
}
