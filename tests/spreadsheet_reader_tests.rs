// tests/spreadsheet_reader_tests.rs
//
// Covers the file-level side of the import pipeline: extension dispatch,
// encoding fallback, header normalization and batched row delivery.

use std::io::Write;

use qbank_backend::import::reader::{CsvRowSource, RowSource, decode_to_utf8, open_row_source};

fn temp_csv(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("temp file");
    file.write_all(contents).expect("write temp csv");
    file
}

#[test]
fn opens_csv_by_path_and_numbers_rows_after_the_header() {
    // Arrange
    let file = temp_csv(b"question_text,option_a\nfirst,1\nsecond,2");

    // Act
    let mut source = open_row_source(file.path()).expect("csv should open");
    let batch = source.next_batch(10);

    // Assert: first data row is row 2 (header-adjusted)
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].number, 2);
    assert_eq!(batch[1].number, 3);

    let row = batch[0].record.as_ref().expect("row should parse");
    assert_eq!(row.get("question_text").map(String::as_str), Some("first"));
    assert_eq!(row.get("option_a").map(String::as_str), Some("1"));
}

#[test]
fn rejects_unsupported_extensions() {
    // Arrange
    let mut file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("temp file");
    file.write_all(b"not a spreadsheet").unwrap();

    // Act / Assert
    let result = open_row_source(file.path());
    assert!(result.is_err());
}

#[test]
fn header_names_are_normalized() {
    // Arrange: mixed case, padding and internal spaces in the header
    let source = CsvRowSource::from_bytes(
        b"  Question Text ,OPTION_A, Correct Answer \nWhat?,yes,A".to_vec(),
    );

    // Act
    let mut source = source.expect("header should parse");
    let batch = source.next_batch(10);

    // Assert
    let row = batch[0].record.as_ref().unwrap();
    assert!(row.contains_key("question_text"));
    assert!(row.contains_key("option_a"));
    assert!(row.contains_key("correct_answer"));
}

#[test]
fn delivers_rows_in_bounded_batches() {
    // Arrange
    let mut csv = String::from("question_text\n");
    for i in 0..5 {
        csv.push_str(&format!("q{}\n", i));
    }
    let mut source = CsvRowSource::from_bytes(csv.into_bytes()).unwrap();

    // Act / Assert
    assert_eq!(source.next_batch(2).len(), 2);
    assert_eq!(source.next_batch(2).len(), 2);
    assert_eq!(source.next_batch(2).len(), 1);
    assert!(source.next_batch(2).is_empty());
}

#[test]
fn short_rows_are_tolerated() {
    // Arrange: second data row is missing trailing fields
    let mut source =
        CsvRowSource::from_bytes(b"question_text,option_a,option_b\nfull,1,2\nshort,1".to_vec())
            .unwrap();

    // Act
    let batch = source.next_batch(10);

    // Assert: absent cells simply do not appear in the row map
    let short = batch[1].record.as_ref().unwrap();
    assert_eq!(short.get("question_text").map(String::as_str), Some("short"));
    assert!(short.get("option_b").is_none());
}

#[test]
fn empty_cells_are_absent_from_the_row_map() {
    // Arrange
    let mut source = CsvRowSource::from_bytes(
        b"question_text,option_a,option_b\nWhat?,,  \n".to_vec(),
    )
    .unwrap();

    // Act
    let batch = source.next_batch(10);

    // Assert: empty and whitespace-only cells are dropped
    let row = batch[0].record.as_ref().unwrap();
    assert!(row.get("option_a").is_none());
    assert!(row.get("option_b").is_none());
}

#[test]
fn utf8_bom_is_stripped() {
    // Arrange
    let bytes = "\u{FEFF}question_text\nWhat?".as_bytes().to_vec();
    let mut source = CsvRowSource::from_bytes(bytes).unwrap();

    // Act
    let batch = source.next_batch(10);

    // Assert: the first header is 'question_text', not BOM-prefixed
    let row = batch[0].record.as_ref().unwrap();
    assert_eq!(row.get("question_text").map(String::as_str), Some("What?"));
}

#[test]
fn non_utf8_input_falls_back_to_windows_1252() {
    // Arrange: 0x92 is the Windows-1252 right single quotation mark
    let (decoded, encoding) = decode_to_utf8(b"Don\x92t");

    // Assert
    assert_eq!(encoding, "windows-1252");
    assert_eq!(decoded, "Don\u{2019}t");
}

#[test]
fn windows_1252_csv_rows_decode_end_to_end() {
    // Arrange
    let mut source =
        CsvRowSource::from_bytes(b"question_text,option_a\nDon\x92t panic,1".to_vec()).unwrap();

    // Act
    let batch = source.next_batch(10);

    // Assert
    let row = batch[0].record.as_ref().unwrap();
    assert_eq!(
        row.get("question_text").map(String::as_str),
        Some("Don\u{2019}t panic")
    );
}
