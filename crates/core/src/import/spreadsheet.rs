//! Workbook parsing (xlsx, xlsm, xls, ods). The first worksheet is read and
//! its first row is the header.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Number, Value};

use super::{rows_from_table, ImportError, Row};

/// Parse the first worksheet of a workbook into row objects.
pub fn parse_workbook(data: &[u8]) -> Result<Vec<Row>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
        .map_err(|e| ImportError::FileParse(format!("Unreadable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::Empty)?
        .map_err(|e| ImportError::FileParse(format!("Unreadable worksheet: {e}")))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or(ImportError::Empty)?
        .iter()
        .map(|cell| match cell_value(cell) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect();

    let cells = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(rows_from_table(headers, cells))
}

/// Whole floats become integers so phone numbers keep their digits.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Value::Number((*f as i64).into()),
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn numeric_cells() {
        assert_eq!(cell_value(&Data::Float(9820012345.0)), Value::from(9820012345i64));
        assert_eq!(cell_value(&Data::Float(2.5)), Value::from(2.5));
        assert_eq!(cell_value(&Data::Int(7)), Value::from(7));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::String("x".into())), Value::from("x"));
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        assert_matches!(
            parse_workbook(b"definitely not a workbook"),
            Err(ImportError::FileParse(_))
        );
    }
}
