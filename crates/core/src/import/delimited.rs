//! Comma- and tab-separated text parsing.
//!
//! Supports double-quoted cells with `""` escapes, quoted cells spanning
//! line breaks, CRLF line endings and a leading UTF-8 byte order mark.

use serde_json::Value;

use super::{rows_from_table, ImportError, Row};

/// Parse delimited text into row objects keyed by the header row.
pub fn parse_delimited(data: &[u8], delimiter: char) -> Result<Vec<Row>, ImportError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| ImportError::FileParse(format!("Invalid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = split_records(text, delimiter)?.into_iter();
    let headers = records.next().ok_or(ImportError::Empty)?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::FileParse("Header row is empty".into()));
    }

    let cells = records
        .map(|record| record.into_iter().map(Value::String).collect())
        .collect();
    Ok(rows_from_table(headers, cells))
}

fn split_records(text: &str, delimiter: char) -> Result<Vec<Vec<String>>, ImportError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut quote_opened_at = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                if ch == '\n' {
                    line += 1;
                }
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' if current.is_empty() => {
                in_quotes = true;
                quote_opened_at = line;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut current));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            c if c == delimiter => record.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::FileParse(format!(
            "Unterminated quoted cell starting on line {quote_opened_at}"
        )));
    }
    if !current.is_empty() || !record.is_empty() {
        record.push(current);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn simple_csv() {
        let rows = parse_delimited(b"Name,Email,Area\nAsha,a@x.org,North\nRavi,,South\n", ',')
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Name"], "Asha");
        assert_eq!(rows[1]["Email"], "");
        assert_eq!(rows[1]["Area"], "South");
    }

    #[test]
    fn quoted_cells_with_commas_quotes_and_newlines() {
        let data = "id,note\r\n1,\"hello, \"\"world\"\"\"\r\n2,\"two\nlines\"\r\n";
        let rows = parse_delimited(data.as_bytes(), ',').unwrap();
        assert_eq!(rows[0]["note"], "hello, \"world\"");
        assert_eq!(rows[1]["note"], "two\nlines");
    }

    #[test]
    fn tab_separated_and_bom() {
        let data = "\u{feff}Name\tPhone\nMeera\t98200\n";
        let rows = parse_delimited(data.as_bytes(), '\t').unwrap();
        assert_eq!(rows[0]["Name"], "Meera");
        assert_eq!(rows[0]["Phone"], "98200");
    }

    #[test]
    fn blank_lines_are_skipped_and_last_line_needs_no_newline() {
        let rows = parse_delimited(b"a,b\n\n1,2\n,\n3,4", ',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["b"], "4");
    }

    #[test]
    fn malformed_input() {
        assert_matches!(parse_delimited(b"", ','), Err(ImportError::Empty));
        assert_matches!(
            parse_delimited(b"a,b\n1,\"open", ','),
            Err(ImportError::FileParse(msg)) if msg.contains("line 2")
        );
        assert_matches!(parse_delimited(&[0xff, 0xfe, 0x00], ','), Err(ImportError::FileParse(_)));
    }
}
