//! Heuristic extraction of contact details from enriched entries, plus the
//! single lead-scoring function shared by interactive submission and bulk
//! import.
//!
//! Matching is by field type and by case-insensitive label substrings. A
//! missing match yields an empty string, never an error.

use serde::Serialize;
use serde_json::Value;

use crate::form::schema::FieldType;
use crate::form::visibility::{is_empty_value, value_text};
use crate::records::{EnrichedEntry, Hierarchy};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const SCORE_EMAIL: i32 = 25;
pub const SCORE_PHONE: i32 = 25;
pub const SCORE_NAME: i32 = 15;
pub const SCORE_INTEREST: i32 = 20;
pub const SCORE_CONSENT: i32 = 15;

pub const MIN_LEAD_SCORE: i32 = 0;
pub const MAX_LEAD_SCORE: i32 = 100;

const PHONE_LABELS: &[&str] = &["phone", "mobile"];
const NAME_LABEL: &str = "name";
const INTEREST_LABEL: &str = "interest";

/// Separators accepted in a hierarchy path string ("North > Pune > Haveli").
const HIERARCHY_SEPARATORS: &[char] = &['>', '/'];

/// Label fragments and object keys recognised for each hierarchy level.
const REGION_NAMES: &[&str] = &["region", "prant", "state"];
const DISTRICT_NAMES: &[&str] = &["district", "jila", "vibhag"];
const BLOCK_NAMES: &[&str] = &["block", "khand", "taluka", "tehsil"];
const UNIT_NAMES: &[&str] = &["unit", "shakha", "mandal"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Contact details extracted from a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub hierarchy: Hierarchy,
}

/// Consent flags detected on the entries, reported next to the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptIns {
    pub whatsapp: bool,
    pub volunteer: bool,
}

impl OptIns {
    pub fn any(&self) -> bool {
        self.whatsapp || self.volunteer
    }
}

/// Inputs to [`score_lead`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadSignals {
    pub has_email: bool,
    pub has_phone: bool,
    pub has_name: bool,
    pub has_interest: bool,
    pub has_consent: bool,
}

impl LeadSignals {
    /// Derive signals from classified contact details and the raw entries.
    pub fn from_entries(classification: &Classification, entries: &[EnrichedEntry]) -> Self {
        Self {
            has_email: !classification.email.is_empty(),
            has_phone: !classification.phone.is_empty(),
            has_name: !classification.name.is_empty(),
            has_interest: has_interest(entries),
            has_consent: detect_opt_ins(entries).any(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Scan entries for name, email, phone and hierarchy, in that fixed
/// precedence. `text_name_fallback` enables the lead-path rule that uses the
/// first plain-text field when no label mentions "name".
pub fn classify(entries: &[EnrichedEntry], text_name_fallback: bool) -> Classification {
    let email = entries
        .iter()
        .find(|e| e.field_type == FieldType::Email.as_str())
        .map(entry_text)
        .unwrap_or_default();

    let phone = first_labelled(entries, PHONE_LABELS)
        .map(entry_text)
        .unwrap_or_default();

    let name = first_labelled(entries, &[NAME_LABEL])
        .or_else(|| {
            text_name_fallback
                .then(|| {
                    entries
                        .iter()
                        .find(|e| e.field_type == FieldType::Text.as_str())
                })
                .flatten()
        })
        .map(entry_text)
        .unwrap_or_default();

    Classification {
        name,
        email,
        phone,
        hierarchy: extract_hierarchy(entries),
    }
}

fn first_labelled<'a>(entries: &'a [EnrichedEntry], needles: &[&str]) -> Option<&'a EnrichedEntry> {
    entries.iter().find(|e| label_contains(&e.field_label, needles))
}

fn label_contains(label: &str, needles: &[&str]) -> bool {
    let label = label.to_lowercase();
    needles.iter().any(|n| label.contains(n))
}

fn entry_text(entry: &EnrichedEntry) -> String {
    value_text(&entry.value).trim().to_string()
}

/// Fill hierarchy levels from hierarchy-selector values first, then from
/// entries whose label names a level. The first match per level wins.
pub fn extract_hierarchy(entries: &[EnrichedEntry]) -> Hierarchy {
    let mut hierarchy = Hierarchy::default();

    for entry in entries
        .iter()
        .filter(|e| e.field_type == FieldType::HierarchySelector.as_str())
    {
        fill_from_selector(&mut hierarchy, &entry.value);
    }

    for entry in entries {
        for (names, slot) in level_slots(&mut hierarchy) {
            if slot.is_empty() && label_contains(&entry.field_label, names) {
                *slot = entry_text(entry);
            }
        }
    }

    hierarchy
}

fn level_slots(h: &mut Hierarchy) -> [(&'static [&'static str], &mut String); 4] {
    [
        (REGION_NAMES, &mut h.region),
        (DISTRICT_NAMES, &mut h.district),
        (BLOCK_NAMES, &mut h.block),
        (UNIT_NAMES, &mut h.unit),
    ]
}

fn fill_from_selector(hierarchy: &mut Hierarchy, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let key = key.to_lowercase();
                for (names, slot) in level_slots(hierarchy) {
                    if slot.is_empty() && names.contains(&key.as_str()) {
                        *slot = value_text(v).trim().to_string();
                    }
                }
            }
        }
        Value::String(path) => {
            let parts: Vec<String> = path
                .split(HIERARCHY_SEPARATORS)
                .map(|p| p.trim().to_string())
                .collect();
            fill_in_order(hierarchy, parts);
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| value_text(v).trim().to_string()).collect();
            fill_in_order(hierarchy, parts);
        }
        _ => {}
    }
}

fn fill_in_order(hierarchy: &mut Hierarchy, parts: Vec<String>) {
    for ((_, slot), part) in level_slots(hierarchy).into_iter().zip(parts) {
        if slot.is_empty() {
            *slot = part;
        }
    }
}

// ---------------------------------------------------------------------------
// Opt-ins and interest
// ---------------------------------------------------------------------------

/// Detect consent toggles whose value is `"true"`.
pub fn detect_opt_ins(entries: &[EnrichedEntry]) -> OptIns {
    let mut opt_ins = OptIns::default();
    for entry in entries {
        if !is_truthy(&entry.value) {
            continue;
        }
        if entry.field_type == FieldType::WhatsappConsent.as_str() {
            opt_ins.whatsapp = true;
        } else if entry.field_type == FieldType::VolunteerConsent.as_str() {
            opt_ins.volunteer = true;
        }
    }
    opt_ins
}

fn is_truthy(value: &Value) -> bool {
    value_text(value).trim().eq_ignore_ascii_case("true")
}

/// `true` if any entry labelled with "interest" carries a value.
pub fn has_interest(entries: &[EnrichedEntry]) -> bool {
    entries
        .iter()
        .any(|e| label_contains(&e.field_label, &[INTEREST_LABEL]) && !is_empty_value(&e.value))
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Lead score from contact completeness. Always within
/// [`MIN_LEAD_SCORE`, `MAX_LEAD_SCORE`].
pub fn score_lead(signals: LeadSignals) -> i32 {
    let mut score = 0;
    if signals.has_email {
        score += SCORE_EMAIL;
    }
    if signals.has_phone {
        score += SCORE_PHONE;
    }
    if signals.has_name {
        score += SCORE_NAME;
    }
    if signals.has_interest {
        score += SCORE_INTEREST;
    }
    if signals.has_consent {
        score += SCORE_CONSENT;
    }
    clamp_lead_score(score as i64)
}

/// Clamp an externally supplied score into the valid range.
pub fn clamp_lead_score(score: i64) -> i32 {
    score.clamp(MIN_LEAD_SCORE as i64, MAX_LEAD_SCORE as i64) as i32
}
