//! File format detection from the upload's extension and dispatch to the
//! matching parser.

use serde::Serialize;

use super::delimited::parse_delimited;
use super::json::parse_json;
use super::spreadsheet::parse_workbook;
use super::{ImportError, ParsedRow};

/// Extensions accepted for bulk import.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "xlsx", "xlsm", "xls", "ods", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    Csv,
    Tsv,
    Spreadsheet,
    Json,
}

impl ImportFormat {
    /// Detect the format from a file name or path. Unknown or missing
    /// extensions are rejected.
    pub fn from_file_name(name: &str) -> Result<Self, ImportError> {
        let extension = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    pub fn from_extension(extension: &str) -> Result<Self, ImportError> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "json" => Ok(Self::Json),
            other => Err(ImportError::UnsupportedFileFormat {
                extension: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Spreadsheet => "spreadsheet",
            Self::Json => "json",
        }
    }
}

/// Parse the whole file into rows. A file that parses to zero rows is
/// reported as [`ImportError::Empty`].
pub fn parse_rows(format: ImportFormat, data: &[u8]) -> Result<Vec<ParsedRow>, ImportError> {
    let rows: Vec<ParsedRow> = match format {
        ImportFormat::Csv => parse_delimited(data, ',')?.into_iter().map(Ok).collect(),
        ImportFormat::Tsv => parse_delimited(data, '\t')?.into_iter().map(Ok).collect(),
        ImportFormat::Spreadsheet => parse_workbook(data)?.into_iter().map(Ok).collect(),
        ImportFormat::Json => parse_json(data)?,
    };
    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn detects_formats_case_insensitively() {
        assert_eq!(ImportFormat::from_file_name("Leads.CSV").unwrap(), ImportFormat::Csv);
        assert_eq!(
            ImportFormat::from_file_name("/tmp/up/abc.xlsx").unwrap(),
            ImportFormat::Spreadsheet
        );
        assert_eq!(ImportFormat::from_extension(".tsv").unwrap(), ImportFormat::Tsv);
        for ext in SUPPORTED_EXTENSIONS {
            assert!(ImportFormat::from_extension(ext).is_ok());
        }
    }

    #[test]
    fn unknown_extensions_fail_fast() {
        assert_matches!(
            ImportFormat::from_file_name("contacts.pdf"),
            Err(ImportError::UnsupportedFileFormat { extension }) if extension == "pdf"
        );
        assert_matches!(
            ImportFormat::from_file_name("no_extension"),
            Err(ImportError::UnsupportedFileFormat { .. })
        );
    }

    #[test]
    fn header_only_file_is_empty() {
        assert_matches!(parse_rows(ImportFormat::Csv, b"Name,Email\n"), Err(ImportError::Empty));
        assert_matches!(parse_rows(ImportFormat::Json, b"[]"), Err(ImportError::Empty));
        assert_eq!(parse_rows(ImportFormat::Csv, b"Name\nA\n").unwrap().len(), 1);
    }
}
