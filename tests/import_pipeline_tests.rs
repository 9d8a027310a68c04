// tests/import_pipeline_tests.rs
//
// Exercises the bulk question importer end-to-end against in-memory
// reference directories and a recording store, so no database is needed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qbank_backend::error::AppError;
use qbank_backend::import::importer::{Difficulty, ImportOptions, QuestionsImporter};
use qbank_backend::import::reader::CsvRowSource;
use qbank_backend::import::resolver::ReferenceResolver;
use qbank_backend::import::store::{NewOption, NewQuestion, QuestionStore};

/// In-memory stand-in for the exam-type/subject/topic directories.
struct FakeDirectory {
    exam_types: HashMap<i64, String>,
    subjects: HashMap<i64, String>,
    /// (id, subject_id, name)
    topics: Vec<(i64, i64, String)>,
}

impl FakeDirectory {
    fn seeded() -> Self {
        Self {
            exam_types: HashMap::from([(1, "WAEC".to_string()), (2, "JAMB".to_string())]),
            subjects: HashMap::from([
                (10, "Mathematics".to_string()),
                (11, "English".to_string()),
            ]),
            topics: vec![
                (100, 10, "Algebra".to_string()),
                (101, 11, "Comprehension".to_string()),
            ],
        }
    }

    fn resolve(map: &HashMap<i64, String>, raw: &str) -> Option<i64> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return map.contains_key(&id).then_some(id);
        }
        map.iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(raw))
            .map(|(id, _)| *id)
    }
}

#[async_trait]
impl ReferenceResolver for FakeDirectory {
    async fn resolve_exam_type(&self, raw: &str) -> Result<Option<i64>, AppError> {
        Ok(Self::resolve(&self.exam_types, raw))
    }

    async fn resolve_subject(&self, raw: &str) -> Result<Option<i64>, AppError> {
        Ok(Self::resolve(&self.subjects, raw))
    }

    async fn resolve_topic(&self, raw: &str, subject_id: i64) -> Result<Option<i64>, AppError> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return Ok(self
                .topics
                .iter()
                .find(|(tid, sid, _)| *tid == id && *sid == subject_id)
                .map(|(tid, _, _)| *tid));
        }
        Ok(self
            .topics
            .iter()
            .find(|(_, sid, name)| *sid == subject_id && name.eq_ignore_ascii_case(raw))
            .map(|(tid, _, _)| *tid))
    }
}

/// Records every committed row; can simulate a per-row transaction failure.
#[derive(Clone, Default)]
struct RecordingStore {
    saved: Arc<Mutex<Vec<(NewQuestion, Vec<NewOption>)>>>,
    fail_when_text_contains: Option<String>,
}

impl RecordingStore {
    fn saved(&self) -> Vec<(NewQuestion, Vec<NewOption>)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionStore for RecordingStore {
    async fn insert_question(
        &self,
        question: &NewQuestion,
        options: &[NewOption],
    ) -> Result<i64, AppError> {
        if let Some(marker) = &self.fail_when_text_contains {
            if question.question_text.contains(marker.as_str()) {
                return Err(AppError::InternalServerError(
                    "simulated constraint violation".to_string(),
                ));
            }
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push((question.clone(), options.to_vec()));
        Ok(saved.len() as i64)
    }
}

fn default_options() -> ImportOptions {
    ImportOptions {
        default_exam_type_id: None,
        default_subject_id: None,
        created_by: 7,
        batch_label: None,
    }
}

async fn run_csv(
    csv: &str,
    store: RecordingStore,
    options: ImportOptions,
) -> qbank_backend::import::ImportSummary {
    let mut source =
        CsvRowSource::from_bytes(csv.as_bytes().to_vec()).expect("CSV header should parse");
    let importer = QuestionsImporter::new(FakeDirectory::seeded(), store, options);
    importer.run(&mut source).await
}

#[tokio::test]
async fn imports_valid_row() {
    // Arrange
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               2+2=?,3,4,b,WAEC,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 0);
    assert!(summary.errors.is_empty());

    let saved = store.saved();
    assert_eq!(saved.len(), 1);

    let (question, options) = &saved[0];
    assert_eq!(question.question_text, "2+2=?");
    assert_eq!(question.exam_type_id, 1);
    assert_eq!(question.subject_id, 10);
    assert_eq!(question.topic_id, None);
    assert_eq!(question.difficulty, Difficulty::Medium);
    assert_eq!(question.created_by, 7);

    assert_eq!(options.len(), 2);
    assert_eq!(options[0].label, "A");
    assert!(!options[0].is_correct);
    assert_eq!(options[0].sort_order, 0);
    assert_eq!(options[1].label, "B");
    assert!(options[1].is_correct);
    assert_eq!(options[1].sort_order, 1);
}

#[tokio::test]
async fn missing_required_fields_skips_row() {
    // Arrange: no option_b column at all
    let store = RecordingStore::default();
    let csv = "question_text,option_a,correct_answer,exam_type,subject\n\
               What is 2+2?,3,A,WAEC,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        summary.errors,
        vec!["Row 2: Missing required fields (question, option_a, option_b)".to_string()]
    );
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn invalid_correct_answer_skips_row() {
    // Arrange
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,Z,WAEC,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        summary.errors,
        vec!["Row 2: Invalid correct_answer: must be A, B, C, D, E, or F".to_string()]
    );
}

#[tokio::test]
async fn mixed_file_imports_good_rows_and_reports_bad_ones() {
    // Arrange: row 2 valid, row 3 invalid
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,B,WAEC,Mathematics\n\
               What is 3+3?,5,6,Q,WAEC,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("Row 3:"));
    assert_eq!(store.saved().len(), 1);
}

#[tokio::test]
async fn numeric_exam_type_resolves_by_id() {
    // Arrange
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,A,2,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 1);
    assert_eq!(store.saved()[0].0.exam_type_id, 2);
}

#[tokio::test]
async fn unknown_exam_type_without_default_skips_row() {
    // Arrange: id 99 does not exist and no default is configured
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,A,99,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        summary.errors,
        vec!["Row 2: Invalid or missing exam_type".to_string()]
    );
}

#[tokio::test]
async fn unresolved_exam_type_falls_back_to_default() {
    // Arrange: NECO is not in the directory, but a default is configured
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,A,NECO,Mathematics";
    let options = ImportOptions {
        default_exam_type_id: Some(2),
        ..default_options()
    };

    // Act
    let summary = run_csv(csv, store.clone(), options).await;

    // Assert
    assert_eq!(summary.imported, 1);
    assert_eq!(store.saved()[0].0.exam_type_id, 2);
}

#[tokio::test]
async fn unresolved_subject_without_default_skips_row() {
    // Arrange
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,A,WAEC,Astrology";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        summary.errors,
        vec!["Row 2: Invalid or missing subject".to_string()]
    );
}

#[tokio::test]
async fn topic_resolution_is_scoped_to_the_subject() {
    // Arrange: Algebra belongs to Mathematics, Comprehension to English.
    // A topic from the wrong subject is dropped, never an error.
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject,topic\n\
               Solve x+1=2,0,1,B,WAEC,Mathematics,Algebra\n\
               Solve x+2=3,0,1,B,WAEC,Mathematics,Comprehension";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 2);
    let saved = store.saved();
    assert_eq!(saved[0].0.topic_id, Some(100));
    assert_eq!(saved[1].0.topic_id, None);
}

#[tokio::test]
async fn correct_answer_pointing_at_empty_option_skips_row() {
    // Arrange: declared answer C, but only A and B have text
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,C,WAEC,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        summary.errors,
        vec!["Row 2: Invalid correct_answer: option C is empty".to_string()]
    );
}

#[tokio::test]
async fn store_failure_is_isolated_to_its_row() {
    // Arrange: the store rejects the first row's transaction
    let store = RecordingStore {
        fail_when_text_contains: Some("poison".to_string()),
        ..RecordingStore::default()
    };
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               poison row,1,2,A,WAEC,Mathematics\n\
               healthy row,1,2,A,WAEC,Mathematics";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.errors[0].starts_with("Row 2:"));
    assert!(summary.errors[0].contains("simulated constraint violation"));
    assert_eq!(store.saved().len(), 1);
    assert_eq!(store.saved()[0].0.question_text, "healthy row");
}

#[tokio::test]
async fn reimport_creates_duplicates() {
    // Re-importing the same file is intentionally not deduplicated.
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject\n\
               What is 2+2?,3,4,B,WAEC,Mathematics";

    let first = run_csv(csv, store.clone(), default_options()).await;
    let second = run_csv(csv, store.clone(), default_options()).await;

    assert_eq!(first.imported, 1);
    assert_eq!(second.imported, 1);
    assert_eq!(store.saved().len(), 2);
}

#[tokio::test]
async fn processes_files_larger_than_one_chunk() {
    // Arrange: 250 rows, relying on configured defaults for references
    let store = RecordingStore::default();
    let mut csv = String::from("question_text,option_a,option_b,correct_answer\n");
    for i in 0..250 {
        csv.push_str(&format!("Question {},yes,no,A\n", i));
    }
    let options = ImportOptions {
        default_exam_type_id: Some(1),
        default_subject_id: Some(10),
        ..default_options()
    };

    // Act
    let summary = run_csv(&csv, store.clone(), options).await;

    // Assert
    assert_eq!(summary.imported, 250);
    assert_eq!(summary.skipped, 0);
    assert_eq!(store.saved().len(), 250);
}

#[tokio::test]
async fn difficulty_normalizes_and_defaults_to_medium() {
    // Arrange
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject,difficulty\n\
               Q1,1,2,A,WAEC,Mathematics,HARD\n\
               Q2,1,2,A,WAEC,Mathematics,tough\n\
               Q3,1,2,A,WAEC,Mathematics,easy";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert: unknown values default silently, never an error
    assert_eq!(summary.imported, 3);
    let saved = store.saved();
    assert_eq!(saved[0].0.difficulty, Difficulty::Hard);
    assert_eq!(saved[1].0.difficulty, Difficulty::Medium);
    assert_eq!(saved[2].0.difficulty, Difficulty::Easy);
}

#[tokio::test]
async fn header_synonyms_are_accepted() {
    // Arrange: 'question' and 'answer' instead of the canonical names
    let store = RecordingStore::default();
    let csv = "question,option_a,option_b,answer,exam_type_name,subject_name\n\
               What is 2+2?,3,4,B,waec,MATHEMATICS";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 1);
    let (question, options) = &store.saved()[0];
    assert_eq!(question.question_text, "What is 2+2?");
    assert_eq!(question.exam_type_id, 1);
    assert_eq!(question.subject_id, 10);
    assert!(options[1].is_correct);
}

#[tokio::test]
async fn text_fields_are_sanitized_before_persistence() {
    // Arrange: control byte next to a math symbol, curly quotes, padding
    let store = RecordingStore::default();
    let csv = format!(
        "question_text,explanation,option_a,option_b,correct_answer,exam_type,subject\n\
         \"  What is {}9?  \",\"{}three{}\",\"\u{201C}3\u{201D}\",4,A,WAEC,Mathematics",
        "\u{221A}\u{000B}", "\u{2018}", "\u{2019}"
    );

    // Act
    let summary = run_csv(&csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 1);
    let (question, options) = &store.saved()[0];
    assert_eq!(question.question_text, "What is \u{221A}9?");
    assert_eq!(question.explanation.as_deref(), Some("'three'"));
    assert_eq!(options[0].option_text, "\"3\"");
}

#[tokio::test]
async fn year_parses_when_numeric_and_is_dropped_otherwise() {
    // Arrange
    let store = RecordingStore::default();
    let csv = "question_text,option_a,option_b,correct_answer,exam_type,subject,year\n\
               Q1,1,2,A,WAEC,Mathematics,2019\n\
               Q2,1,2,A,WAEC,Mathematics,unknown";

    // Act
    let summary = run_csv(csv, store.clone(), default_options()).await;

    // Assert
    assert_eq!(summary.imported, 2);
    let saved = store.saved();
    assert_eq!(saved[0].0.year, Some(2019));
    assert_eq!(saved[1].0.year, None);
}
