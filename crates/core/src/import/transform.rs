//! Row-to-record transformation for bulk import.
//!
//! Metadata columns are dropped, classification columns (`name`, `email`,
//! `leadScore`, ...) are applied directly, and every other column becomes
//! a response entry labelled with its header. The result goes through the
//! same routing as interactive submissions.

use serde_json::Value;

use super::Row;
use crate::form::schema::FieldType;
use crate::form::visibility::value_text;
use crate::records::{EnrichedEntry, RecordMeta, TargetCollection};
use crate::routing::{build_record, RecordOverrides, RoutedOutcome};
use crate::types::{DbId, Timestamp};

/// Columns describing the record rather than the respondent.
const METADATA_KEYS: &[&str] = &[
    "id",
    "formid",
    "source",
    "sourcetag",
    "createdat",
    "updatedat",
    "submittedat",
    "timestamp",
    "ipaddress",
    "useragent",
    "collection",
];

const NAME_KEYS: &[&str] = &["name", "fullname"];
const EMAIL_KEYS: &[&str] = &["email", "emailaddress"];
const PHONE_KEYS: &[&str] = &["phone", "phonenumber", "mobile", "mobilenumber"];
const SCORE_KEYS: &[&str] = &["leadscore"];
const STATUS_KEYS: &[&str] = &["status"];
const WHATSAPP_KEYS: &[&str] = &["whatsappoptin", "whatsappconsent"];
const VOLUNTEER_KEYS: &[&str] = &["volunteeroptin", "volunteerconsent"];

/// Lowercase and drop separators so `Lead Score`, `lead_score` and
/// `leadScore` compare equal.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Convert one imported row into a routed record tagged with `source_tag`.
pub fn row_to_record(
    row: &Row,
    target: TargetCollection,
    source_tag: &str,
    imported_at: Timestamp,
) -> RoutedOutcome {
    let mut overrides = RecordOverrides::default();
    let mut entries = Vec::new();
    let mut form_id: Option<DbId> = None;
    let mut submitted_at = imported_at;

    for (key, value) in row {
        let normalized = normalize_key(key);
        let key_is = |names: &[&str]| names.contains(&normalized.as_str());

        if key_is(METADATA_KEYS) {
            match normalized.as_str() {
                "formid" => form_id = as_i64(value),
                "submittedat" | "createdat" | "timestamp" => {
                    if let Some(ts) = as_timestamp(value) {
                        submitted_at = ts;
                    }
                }
                _ => {}
            }
        } else if key_is(NAME_KEYS) {
            overrides.name = Some(value_text(value));
        } else if key_is(EMAIL_KEYS) {
            overrides.email = Some(value_text(value));
        } else if key_is(PHONE_KEYS) {
            overrides.phone = Some(value_text(value));
        } else if key_is(SCORE_KEYS) {
            overrides.lead_score = as_i64(value);
        } else if key_is(STATUS_KEYS) {
            overrides.status = Some(value_text(value));
        } else if key_is(WHATSAPP_KEYS) {
            overrides.whatsapp_opt_in = Some(as_bool(value));
        } else if key_is(VOLUNTEER_KEYS) {
            overrides.volunteer_opt_in = Some(as_bool(value));
        } else {
            entries.push(EnrichedEntry {
                field_id: key.clone(),
                field_type: infer_field_type(&normalized, value).as_str().to_string(),
                field_label: key.clone(),
                value: value.clone(),
            });
        }
    }

    let meta = RecordMeta {
        form_id,
        source: source_tag.to_string(),
        ip_address: None,
        user_agent: None,
        submitted_at,
    };

    build_record(target, entries, meta, overrides)
}

/// Best guess at a field type from a column header, so type-based
/// classification still works for imported rows.
fn infer_field_type(normalized_key: &str, value: &Value) -> FieldType {
    if normalized_key.contains("email") {
        FieldType::Email
    } else if normalized_key.contains("whatsapp") && normalized_key.contains("consent") {
        FieldType::WhatsappConsent
    } else if normalized_key.contains("volunteer") && normalized_key.contains("consent") {
        FieldType::VolunteerConsent
    } else if value.is_number() {
        FieldType::Number
    } else if value.is_array() {
        FieldType::Checkbox
    } else {
        FieldType::Text
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "y" | "1"),
        _ => false,
    }
}

fn as_timestamp(value: &Value) -> Option<Timestamp> {
    let text = value.as_str()?;
    chrono::DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}
