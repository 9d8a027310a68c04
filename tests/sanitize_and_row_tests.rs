// tests/sanitize_and_row_tests.rs
//
// Unit-level coverage for the pure pieces of the import pipeline: text
// sanitation and column-synonym resolution.

use qbank_backend::import::row::{NormalizedRow, RawRow, normalize_key};
use qbank_backend::import::sanitize::sanitize_text;

#[test]
fn strips_control_bytes_and_preserves_unicode_symbols() {
    // 0x0B interleaved with a mathematical symbol
    assert_eq!(sanitize_text("\u{221A}\u{000B}2"), "\u{221A}2");

    // Currency, fractions, superscripts pass through untouched
    assert_eq!(sanitize_text("\u{20A6}500 \u{00BD} x\u{00B2}"), "\u{20A6}500 \u{00BD} x\u{00B2}");
}

#[test]
fn strips_the_whole_control_range() {
    let dirty: String = "a\u{0000}b\u{0008}c\u{000B}d\u{000C}e\u{000E}f\u{001F}g\u{007F}h".into();
    assert_eq!(sanitize_text(&dirty), "abcdefgh");
}

#[test]
fn keeps_tabs_and_newlines() {
    assert_eq!(sanitize_text("a\tb\nc"), "a\tb\nc");
}

#[test]
fn normalizes_curly_quotes_to_ascii() {
    assert_eq!(
        sanitize_text("\u{201C}quote\u{201D} and \u{2018}tick\u{2019}"),
        "\"quote\" and 'tick'"
    );
}

#[test]
fn trims_surrounding_whitespace() {
    assert_eq!(sanitize_text("  padded  "), "padded");
}

#[test]
fn normalize_key_lowercases_and_underscores() {
    assert_eq!(normalize_key("  Question Text "), "question_text");
    assert_eq!(normalize_key("OPTION_A"), "option_a");
    assert_eq!(normalize_key("Correct  Answer"), "correct_answer");
}

fn raw(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn resolves_fields_through_synonyms() {
    let row = raw(&[
        ("question", "What is 2+2?"),
        ("exam_type_name", "WAEC"),
        ("subject_name", "Mathematics"),
        ("topic_name", "Algebra"),
        ("answer", "B"),
    ]);

    let normalized = NormalizedRow::from_raw(&row);
    assert_eq!(normalized.question_text.as_deref(), Some("What is 2+2?"));
    assert_eq!(normalized.exam_type.as_deref(), Some("WAEC"));
    assert_eq!(normalized.subject.as_deref(), Some("Mathematics"));
    assert_eq!(normalized.topic.as_deref(), Some("Algebra"));
    assert_eq!(normalized.correct_answer.as_deref(), Some("B"));
}

#[test]
fn canonical_name_wins_over_its_synonym() {
    let row = raw(&[("question_text", "canonical"), ("question", "synonym")]);

    let normalized = NormalizedRow::from_raw(&row);
    assert_eq!(normalized.question_text.as_deref(), Some("canonical"));
}

#[test]
fn blank_values_count_as_missing() {
    let row = raw(&[("question_text", "   "), ("question", "fallback")]);

    // A blank canonical cell falls through to the synonym
    let normalized = NormalizedRow::from_raw(&row);
    assert_eq!(normalized.question_text.as_deref(), Some("fallback"));
}

#[test]
fn unrecognized_columns_are_ignored() {
    let row = raw(&[
        ("question_text", "What?"),
        ("uploader_notes", "ignore me"),
        ("option_a", "yes"),
    ]);

    let normalized = NormalizedRow::from_raw(&row);
    assert_eq!(normalized.question_text.as_deref(), Some("What?"));
    assert_eq!(normalized.options[0].as_deref(), Some("yes"));
    assert_eq!(normalized.options[1], None);
}

#[test]
fn options_map_positionally_a_through_f() {
    let row = raw(&[
        ("option_a", "first"),
        ("option_c", "third"),
        ("option_f", "sixth"),
    ]);

    let normalized = NormalizedRow::from_raw(&row);
    assert_eq!(normalized.options[0].as_deref(), Some("first"));
    assert_eq!(normalized.options[1], None);
    assert_eq!(normalized.options[2].as_deref(), Some("third"));
    assert_eq!(normalized.options[5].as_deref(), Some("sixth"));
}
