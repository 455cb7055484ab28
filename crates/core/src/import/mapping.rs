//! Column mapping suggestions from the AI assistant.
//!
//! The assistant sees a few sample rows and answers with the collection it
//! thinks the file belongs to and a header-to-key mapping. Applying the
//! mapping only renames keys; values are never altered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Row;
use crate::records::TargetCollection;

/// Keys the assistant may map columns onto.
pub const CANONICAL_KEYS: &[&str] = &[
    "name",
    "email",
    "phone",
    "leadScore",
    "status",
    "region",
    "district",
    "block",
    "unit",
    "interest",
    "whatsappOptIn",
    "volunteerOptIn",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSuggestion {
    #[serde(default)]
    pub collection_type: Option<String>,
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub confidence: f64,
}

impl MappingSuggestion {
    /// The suggested collection, if it names one we know.
    pub fn suggested_collection(&self) -> Option<TargetCollection> {
        self.collection_type
            .as_deref()
            .and_then(TargetCollection::from_str)
    }
}

/// Rename row keys per `suggestion.field_mappings`. A mapping onto a key
/// that already holds a non-empty value is skipped.
pub fn apply_mapping(row: &Row, suggestion: &MappingSuggestion) -> Row {
    let mut mapped = Row::new();
    for (key, value) in row {
        let target = suggestion
            .field_mappings
            .get(key)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && *t != key.as_str());
        match target {
            Some(t) if !occupied(row, t) && !occupied(&mapped, t) => {
                mapped.insert(t.to_string(), value.clone());
            }
            // An earlier column was already mapped onto this (empty) key.
            _ if occupied(&mapped, key) => {}
            _ => {
                mapped.insert(key.clone(), value.clone());
            }
        }
    }
    mapped
}

fn occupied(row: &Row, key: &str) -> bool {
    row.get(key)
        .is_some_and(|v| !crate::form::visibility::is_empty_value(v))
}

/// Chat messages asking for a mapping of `sample` rows.
pub fn mapping_messages(sample: &[Row], target: TargetCollection) -> Vec<Value> {
    let system = format!(
        "You map spreadsheet columns onto contact record keys. Reply with a single JSON \
         object: {{\"collectionType\": \"lead\" | \"volunteer\" | \"generic\", \
         \"fieldMappings\": {{<column header>: <key>}}, \"confidence\": <0..1>}}. \
         Allowed keys: {}. Omit columns that match none of them.",
        CANONICAL_KEYS.join(", ")
    );
    let user = json!({
        "targetCollection": target.as_str(),
        "sampleRows": sample,
    });
    vec![
        json!({"role": "system", "content": system}),
        json!({"role": "user", "content": user.to_string()}),
    ]
}

/// Parse the assistant's reply. Tolerates Markdown code fences and text
/// around the JSON object.
pub fn parse_suggestion(content: &str) -> Result<MappingSuggestion, String> {
    let start = content.find('{').ok_or("reply contains no JSON object")?;
    let end = content.rfind('}').ok_or("reply contains no JSON object")?;
    if end < start {
        return Err("reply contains no JSON object".into());
    }
    let mut suggestion: MappingSuggestion = serde_json::from_str(&content[start..=end])
        .map_err(|e| format!("invalid mapping JSON: {e}"))?;
    suggestion.confidence = suggestion.confidence.clamp(0.0, 1.0);
    Ok(suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn renames_keys_without_touching_values() {
        let suggestion = MappingSuggestion {
            collection_type: Some("lead".into()),
            field_mappings: BTreeMap::from([
                ("Naam".to_string(), "name".to_string()),
                ("Mob".to_string(), "phone".to_string()),
            ]),
            confidence: 0.9,
        };
        let mapped = apply_mapping(&row(json!({"Naam": "Asha", "Mob": 98, "City": "Pune"})), &suggestion);
        assert_eq!(mapped["name"], "Asha");
        assert_eq!(mapped["phone"], 98);
        assert_eq!(mapped["City"], "Pune");
        assert!(!mapped.contains_key("Naam"));
    }

    #[test]
    fn existing_values_are_not_overwritten() {
        let suggestion = MappingSuggestion {
            field_mappings: BTreeMap::from([("Alt".to_string(), "email".to_string())]),
            ..Default::default()
        };
        let mapped = apply_mapping(&row(json!({"email": "a@b.c", "Alt": "x@y.z"})), &suggestion);
        assert_eq!(mapped["email"], "a@b.c");
        assert_eq!(mapped["Alt"], "x@y.z");
    }

    #[test]
    fn parses_fenced_replies() {
        let reply = "Sure:\n```json\n{\"collectionType\": \"swayamsevak\", \
                     \"fieldMappings\": {\"Naam\": \"name\"}, \"confidence\": 1.4}\n```";
        let suggestion = parse_suggestion(reply).unwrap();
        assert_eq!(suggestion.suggested_collection(), Some(TargetCollection::Volunteer));
        assert_eq!(suggestion.field_mappings["Naam"], "name");
        assert_eq!(suggestion.confidence, 1.0);

        assert!(parse_suggestion("no idea").is_err());
        assert!(parse_suggestion("{not json}").is_err());
    }

    #[test]
    fn prompt_carries_sample_and_target() {
        let messages = mapping_messages(&[row(json!({"Naam": "A"}))], TargetCollection::Volunteer);
        assert_eq!(messages.len(), 2);
        let user = messages[1]["content"].as_str().unwrap();
        assert!(user.contains("\"targetCollection\":\"volunteer\""));
        assert!(user.contains("Naam"));
    }
}
