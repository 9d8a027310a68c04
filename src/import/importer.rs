// src/import/importer.rs

use serde::Serialize;

use crate::import::reader::RowSource;
use crate::import::resolver::ReferenceResolver;
use crate::import::row::{NormalizedRow, OPTION_LABELS, RawRow};
use crate::import::sanitize::sanitize_text;
use crate::import::store::{NewOption, NewQuestion, QuestionStore};

/// Rows are pulled from the source in fixed-size batches to bound memory.
/// Not a transactional unit: each row commits on its own.
pub const CHUNK_SIZE: usize = 100;

/// Question difficulty as normalized by the importer.
/// Anything unrecognized silently becomes `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("easy") => Difficulty::Easy,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// What the caller gets back after the whole file is processed.
/// Errors are ordered by row, one entry per failed row.
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Per-job configuration, supplied once by the invoking layer.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Used when a row does not carry its own exam type.
    pub default_exam_type_id: Option<i64>,
    /// Used when a row does not carry its own subject.
    pub default_subject_id: Option<i64>,
    /// Recorded as the creator of every imported question.
    pub created_by: i64,
    /// Informational only; shows up in the logs.
    pub batch_label: Option<String>,
}

/// Converts spreadsheet rows into validated question + option records.
///
/// Row failures never abort the job: each row resolves, validates and
/// persists independently, and failures are collected into the summary.
/// One importer instance serves one file.
pub struct QuestionsImporter<R, S> {
    resolver: R,
    store: S,
    options: ImportOptions,
}

impl<R: ReferenceResolver, S: QuestionStore> QuestionsImporter<R, S> {
    pub fn new(resolver: R, store: S, options: ImportOptions) -> Self {
        Self {
            resolver,
            store,
            options,
        }
    }

    /// Drains `source` in chunks of [`CHUNK_SIZE`] rows and processes every
    /// row through the full pipeline. Always returns a summary; there is no
    /// fatal path once the source is open.
    pub async fn run(&self, source: &mut dyn RowSource) -> ImportSummary {
        if let Some(label) = &self.options.batch_label {
            tracing::info!("starting question import batch '{}'", label);
        }

        let mut summary = ImportSummary::default();

        loop {
            let batch = source.next_batch(CHUNK_SIZE);
            if batch.is_empty() {
                break;
            }

            for row in batch {
                let outcome = match &row.record {
                    Ok(raw) => self.import_row(raw).await,
                    Err(message) => Err(message.clone()),
                };

                match outcome {
                    Ok(()) => summary.imported += 1,
                    Err(message) => {
                        summary.skipped += 1;
                        summary.errors.push(format!("Row {}: {}", row.number, message));
                    }
                }
            }
        }

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "question import finished"
        );
        summary
    }

    async fn import_row(&self, raw: &RawRow) -> Result<(), String> {
        let row = NormalizedRow::from_raw(raw);

        let (Some(question_text), Some(_), Some(_)) =
            (&row.question_text, &row.options[0], &row.options[1])
        else {
            return Err("Missing required fields (question, option_a, option_b)".to_string());
        };

        let exam_type_id = self.resolve_exam_type(row.exam_type.as_deref()).await?;
        let subject_id = self.resolve_subject(row.subject.as_deref()).await?;

        // Topic is optional and must belong to the resolved subject; an
        // unresolved topic is omitted, never an error.
        let topic_id = match row.topic.as_deref() {
            Some(raw_topic) => match self.resolver.resolve_topic(raw_topic, subject_id).await {
                Ok(found) => found,
                Err(_) => None,
            },
            None => None,
        };

        let correct_index = row
            .correct_answer
            .as_deref()
            .and_then(parse_answer_label)
            .ok_or_else(|| "Invalid correct_answer: must be A, B, C, D, E, or F".to_string())?;

        let mut options = Vec::new();
        for (index, text) in row.options.iter().enumerate() {
            let Some(text) = text else { continue };
            let option_text = sanitize_text(text);
            if option_text.is_empty() {
                continue;
            }
            options.push(NewOption {
                label: OPTION_LABELS[index],
                option_text,
                is_correct: index == correct_index,
                sort_order: index as i32,
            });
        }

        // The declared answer must point at an option that actually exists,
        // otherwise the created question would have no correct option at all.
        if !options.iter().any(|o| o.is_correct) {
            return Err(format!(
                "Invalid correct_answer: option {} is empty",
                OPTION_LABELS[correct_index]
            ));
        }

        let question = NewQuestion {
            question_text: sanitize_text(question_text),
            explanation: row
                .explanation
                .as_deref()
                .map(sanitize_text)
                .filter(|s| !s.is_empty()),
            exam_type_id,
            subject_id,
            topic_id,
            difficulty: Difficulty::from_raw(row.difficulty.as_deref()),
            year: row.year.as_deref().and_then(|y| y.trim().parse().ok()),
            created_by: self.options.created_by,
        };

        self.store
            .insert_question(&question, &options)
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    async fn resolve_exam_type(&self, raw: Option<&str>) -> Result<i64, String> {
        if let Some(raw) = raw {
            match self.resolver.resolve_exam_type(raw).await {
                Ok(Some(id)) => return Ok(id),
                Ok(None) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
        self.options
            .default_exam_type_id
            .ok_or_else(|| "Invalid or missing exam_type".to_string())
    }

    async fn resolve_subject(&self, raw: Option<&str>) -> Result<i64, String> {
        if let Some(raw) = raw {
            match self.resolver.resolve_subject(raw).await {
                Ok(Some(id)) => return Ok(id),
                Ok(None) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
        self.options
            .default_subject_id
            .ok_or_else(|| "Invalid or missing subject".to_string())
    }
}

/// Maps a correct-answer cell to the option index it names.
/// Case-insensitive, restricted to A-F.
fn parse_answer_label(raw: &str) -> Option<usize> {
    let upper = raw.trim().to_uppercase();
    OPTION_LABELS.iter().position(|label| *label == upper)
}
