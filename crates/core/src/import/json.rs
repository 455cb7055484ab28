//! JSON import: a top-level array of objects, or an object wrapping one in
//! `records` or `data`.
//!
//! Only the document shape can fail the file. An array element that is not
//! an object becomes a failed record in its position.

use serde_json::Value;

use super::{ImportError, ParsedRow};

const WRAPPER_KEYS: &[&str] = &["records", "data"];

pub fn parse_json(data: &[u8]) -> Result<Vec<ParsedRow>, ImportError> {
    let document: Value = serde_json::from_slice(data)
        .map_err(|e| ImportError::FileParse(format!("Invalid JSON: {e}")))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                ImportError::FileParse(
                    "Expected an array of records or an object with a `records`/`data` array"
                        .into(),
                )
            })?,
        _ => {
            return Err(ImportError::FileParse(
                "Expected an array of records".into(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(format!("Expected an object, found {}", kind_of(&other))),
        })
        .collect())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn top_level_array() {
        let rows = parse_json(br#"[{"name": "A"}, {"name": "B", "age": 30}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_ref().unwrap()["age"], 30);
    }

    #[test]
    fn wrapped_arrays() {
        assert_eq!(parse_json(br#"{"records": [{"a": 1}]}"#).unwrap().len(), 1);
        assert_eq!(parse_json(br#"{"meta": {}, "data": [{"a": 1}, {"a": 2}]}"#).unwrap().len(), 2);
    }

    #[test]
    fn rejects_non_record_documents() {
        assert_matches!(parse_json(b"{\"a\": 1}"), Err(ImportError::FileParse(_)));
        assert_matches!(parse_json(b"42"), Err(ImportError::FileParse(_)));
        assert_matches!(parse_json(b"[{"), Err(ImportError::FileParse(_)));
    }

    #[test]
    fn non_object_elements_fail_alone() {
        let rows = parse_json(br#"[{"Name": "A"}, {"Name": "B"}, "oops", {"Name": "C"}]"#).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].as_ref().unwrap()["Name"], "B");
        assert_matches!(&rows[2], Err(msg) if msg == "Expected an object, found a string");
        assert_eq!(rows[3].as_ref().unwrap()["Name"], "C");
    }
}
