// src/import/row.rs

use std::collections::HashMap;

/// One raw spreadsheet row: normalized column name -> cell text.
/// Empty cells are absent from the map.
pub type RawRow = HashMap<String, String>;

/// Option labels in positional order; the index doubles as `sort_order`.
pub const OPTION_LABELS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

// Accepted column-name synonyms per logical field, in match order.
const QUESTION_TEXT: &[&str] = &["question_text", "question"];
const EXPLANATION: &[&str] = &["explanation"];
const EXAM_TYPE: &[&str] = &["exam_type", "exam_type_name"];
const SUBJECT: &[&str] = &["subject", "subject_name"];
const TOPIC: &[&str] = &["topic", "topic_name"];
const DIFFICULTY: &[&str] = &["difficulty"];
const YEAR: &[&str] = &["year"];
const CORRECT_ANSWER: &[&str] = &["correct_answer", "answer"];
const OPTIONS: [&[&str]; 6] = [
    &["option_a"],
    &["option_b"],
    &["option_c"],
    &["option_d"],
    &["option_e"],
    &["option_f"],
];

/// Normalizes a header cell into the form used as `RawRow` key:
/// trimmed, lowercased, internal whitespace collapsed to underscores.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// A row mapped onto the fixed logical field set.
/// Fields that were missing or blank in the sheet are `None`.
#[derive(Debug, Default)]
pub struct NormalizedRow {
    pub question_text: Option<String>,
    pub explanation: Option<String>,
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub year: Option<String>,
    pub correct_answer: Option<String>,
    /// Option texts A-F by position.
    pub options: [Option<String>; 6],
}

impl NormalizedRow {
    /// Resolves each logical field through its alias list, first match wins.
    /// Unrecognized columns in `row` are simply ignored.
    pub fn from_raw(row: &RawRow) -> Self {
        NormalizedRow {
            question_text: field(row, QUESTION_TEXT),
            explanation: field(row, EXPLANATION),
            exam_type: field(row, EXAM_TYPE),
            subject: field(row, SUBJECT),
            topic: field(row, TOPIC),
            difficulty: field(row, DIFFICULTY),
            year: field(row, YEAR),
            correct_answer: field(row, CORRECT_ANSWER),
            options: std::array::from_fn(|i| field(row, OPTIONS[i])),
        }
    }
}

fn field(row: &RawRow, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        if let Some(value) = row.get(*alias) {
            if !value.trim().is_empty() {
                return Some(value.clone());
            }
        }
    }
    None
}
