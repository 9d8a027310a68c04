// src/import/reader.rs

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::AppError;
use crate::import::row::{RawRow, normalize_key};

/// One row as pulled from the source file. `number` is the 1-based
/// spreadsheet row number including the header (first data row is 2), so
/// error messages line up with what the uploader sees in their editor.
#[derive(Debug)]
pub struct SourceRow {
    pub number: usize,
    /// The parsed row, or a reader-level failure message for this row
    /// (malformed record, unreadable cell). Reader failures never abort
    /// the file; they are surfaced per row.
    pub record: Result<RawRow, String>,
}

/// Streaming access to spreadsheet rows in bounded batches.
pub trait RowSource: Send {
    /// Returns up to `limit` rows; an empty vec means the file is drained.
    fn next_batch(&mut self, limit: usize) -> Vec<SourceRow>;
}

/// Opens the right `RowSource` for the file's extension.
pub fn open_row_source(path: &Path) -> Result<Box<dyn RowSource>, AppError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => Ok(Box::new(CsvRowSource::from_bytes(std::fs::read(path)?)?)),
        "xls" | "xlsx" => Ok(Box::new(WorkbookRowSource::open(path)?)),
        other => Err(AppError::BadRequest(format!(
            "Unsupported spreadsheet format '{}': expected csv, xls or xlsx",
            other
        ))),
    }
}

/// Decodes raw file bytes into UTF-8 text.
/// Valid UTF-8 passes through (minus a BOM); anything else falls back to
/// Windows-1252, which cannot fail.
pub fn decode_to_utf8(bytes: &[u8]) -> (String, &'static str) {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
            (text.to_string(), "utf-8")
        }
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            (decoded.into_owned(), "windows-1252")
        }
    }
}

/// CSV-backed row source.
pub struct CsvRowSource {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<std::io::Cursor<Vec<u8>>>,
    next_number: usize,
}

impl CsvRowSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AppError> {
        let (text, encoding) = decode_to_utf8(&bytes);
        tracing::debug!("decoded csv upload as {}", encoding);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(std::io::Cursor::new(text.into_bytes()));

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::BadRequest(format!("Unable to read header row: {}", e)))?
            .iter()
            .map(normalize_key)
            .collect();

        Ok(Self {
            headers,
            records: reader.into_records(),
            next_number: 2,
        })
    }
}

impl RowSource for CsvRowSource {
    fn next_batch(&mut self, limit: usize) -> Vec<SourceRow> {
        let mut batch = Vec::new();
        while batch.len() < limit {
            let Some(result) = self.records.next() else {
                break;
            };
            let number = self.next_number;
            self.next_number += 1;

            let record = match result {
                Ok(rec) => {
                    let mut row = RawRow::new();
                    for (i, header) in self.headers.iter().enumerate() {
                        if header.is_empty() {
                            continue;
                        }
                        if let Some(value) = rec.get(i) {
                            if !value.trim().is_empty() {
                                row.insert(header.clone(), value.to_string());
                            }
                        }
                    }
                    Ok(row)
                }
                Err(e) => Err(format!("Unreadable row: {}", e)),
            };

            batch.push(SourceRow { number, record });
        }
        batch
    }
}

/// XLS/XLSX-backed row source. Calamine materializes the sheet range in
/// memory; batching still bounds what the importer holds at once.
pub struct WorkbookRowSource {
    headers: Vec<String>,
    rows: std::vec::IntoIter<Vec<Data>>,
    next_number: usize,
}

impl WorkbookRowSource {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| AppError::BadRequest(format!("Unable to open workbook: {}", e)))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::BadRequest("Workbook has no sheets".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            AppError::BadRequest(format!("Unable to read sheet '{}': {}", sheet_name, e))
        })?;

        let mut rows_iter = range.rows();
        let headers: Vec<String> = rows_iter
            .next()
            .map(|r| {
                r.iter()
                    .map(|c| normalize_key(&display_cell(c).unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Vec<Data>> = rows_iter.map(|r| r.to_vec()).collect();

        Ok(Self {
            headers,
            rows: rows.into_iter(),
            next_number: 2,
        })
    }
}

impl RowSource for WorkbookRowSource {
    fn next_batch(&mut self, limit: usize) -> Vec<SourceRow> {
        let mut batch = Vec::new();
        while batch.len() < limit {
            let Some(cells) = self.rows.next() else {
                break;
            };
            let number = self.next_number;
            self.next_number += 1;

            let mut row = RawRow::new();
            let mut failure = None;
            for (i, header) in self.headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let Some(cell) = cells.get(i) else {
                    continue;
                };
                match display_cell(cell) {
                    Ok(value) => {
                        if !value.trim().is_empty() {
                            row.insert(header.clone(), value);
                        }
                    }
                    Err(msg) => {
                        failure = Some(format!("Unreadable cell in column '{}': {}", header, msg));
                        break;
                    }
                }
            }

            batch.push(SourceRow {
                number,
                record: match failure {
                    Some(msg) => Err(msg),
                    None => Ok(row),
                },
            });
        }
        batch
    }
}

fn display_cell(cell: &Data) -> Result<String, String> {
    match cell {
        Data::Empty => Ok(String::new()),
        Data::String(s) => Ok(s.clone()),
        Data::Float(f) => {
            // Whole numbers come back as floats from Excel; render "2019",
            // not "2019.0", so id and year columns resolve.
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Ok(format!("{}", *f as i64))
            } else {
                Ok(f.to_string())
            }
        }
        Data::Int(i) => Ok(i.to_string()),
        Data::Bool(b) => Ok(b.to_string()),
        Data::DateTime(dt) => Ok(dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Ok(s.clone()),
        Data::Error(e) => Err(format!("{:?}", e)),
    }
}
