//! Pure parts of the bulk import pipeline: file format dispatch and
//! parsing into row objects, row-to-record transformation, AI mapping
//! suggestions, and job progress bookkeeping.
//!
//! No database, no async, no I/O beyond the bytes handed in.

pub mod delimited;
pub mod format;
pub mod job;
pub mod json;
pub mod mapping;
pub mod spreadsheet;
pub mod transform;

pub use format::{parse_rows, ImportFormat};
pub use job::{ImportJobStatus, ImportMode, JobProgress};
pub use mapping::{apply_mapping, MappingSuggestion};
pub use transform::row_to_record;

/// One parsed row: column header to cell value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A row as it came out of the file. `Err` carries why that single record
/// is unusable; it still counts toward the job total and fails on its own.
pub type ParsedRow = Result<Row, String>;

/// Source tag used when a job does not name one.
pub const DEFAULT_SOURCE_TAG: &str = "bulk-import";

/// Failures that prevent a file from yielding any rows at all.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Unsupported file format: .{extension}")]
    UnsupportedFileFormat { extension: String },

    #[error("Failed to parse file: {0}")]
    FileParse(String),

    #[error("File contains no records")]
    Empty,
}

/// Turn a header row plus data rows into row objects.
///
/// Headers are trimmed, blank headers become `column_<n>` and repeated
/// names get a `_2`, `_3`, ... suffix. Rows whose cells are all empty are
/// skipped. Short rows are padded with empty strings; extra cells beyond
/// the header are dropped.
pub fn rows_from_table(
    headers: Vec<String>,
    records: Vec<Vec<serde_json::Value>>,
) -> Vec<Row> {
    let headers = normalize_headers(headers);
    records
        .into_iter()
        .filter(|cells| !cells.iter().all(crate::form::visibility::is_empty_value))
        .map(|cells| {
            let mut cells = cells.into_iter();
            headers
                .iter()
                .map(|h| {
                    let cell = cells
                        .next()
                        .unwrap_or_else(|| serde_json::Value::String(String::new()));
                    (h.clone(), cell)
                })
                .collect()
        })
        .collect()
}

fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = match h.trim() {
                "" => format!("column_{}", i + 1),
                trimmed => trimmed.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            }
        })
        .collect()
}
