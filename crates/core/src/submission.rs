//! Submission processor: resolve submitted field ids against the schema,
//! enrich them with type and label, classify, and pick the target
//! collection. Storage is the caller's job.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::OptIns;
use crate::error::CoreError;
use crate::form::schema::{Form, FormSettings, GroupLink};
use crate::form::visibility::{missing_required_fields, value_text, FieldValues};
use crate::records::{
    EnrichedEntry, RecordMeta, RoutedRecord, TargetCollection, UNKNOWN_FIELD_TYPE,
};
use crate::routing::{build_record, RecordOverrides};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One submitted value as sent by the form renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedEntry {
    #[serde(alias = "field_id")]
    pub field_id: String,
    #[serde(default)]
    pub value: Value,
}

/// Request-level data captured by the front door.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: Timestamp,
}

impl Default for SubmissionMetadata {
    fn default() -> Self {
        Self {
            ip_address: None,
            user_agent: None,
            submitted_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedResponse {
    pub responses: Vec<SubmittedEntry>,
    pub metadata: SubmissionMetadata,
}

impl SubmittedResponse {
    /// Parse a raw payload. The `responses` key must hold an array of
    /// `{fieldId, value}` objects; anything else is a malformed submission.
    pub fn from_json(payload: &Value, metadata: SubmissionMetadata) -> Result<Self, CoreError> {
        let raw = payload
            .get("responses")
            .ok_or_else(|| CoreError::MalformedSubmission("missing `responses`".into()))?;
        let items = raw
            .as_array()
            .ok_or_else(|| CoreError::MalformedSubmission("`responses` must be an array".into()))?;

        let responses = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                SubmittedEntry::deserialize(item)
                    .map_err(|e| CoreError::MalformedSubmission(format!("entry {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            responses,
            metadata,
        })
    }

    /// Submitted values keyed by field id, for visibility evaluation.
    pub fn values(&self) -> FieldValues {
        self.responses
            .iter()
            .map(|e| (e.field_id.clone(), e.value.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldMeta {
    field_type: String,
    label: String,
}

/// Flat lookup from field id to type and label over the whole tree.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    fields: HashMap<String, FieldMeta>,
}

impl FieldIndex {
    pub fn build(form: &Form) -> Self {
        let fields = form
            .all_fields()
            .into_iter()
            .map(|f| {
                let meta = FieldMeta {
                    field_type: f.field_type.as_str().to_string(),
                    label: f.label.clone(),
                };
                (f.id.clone(), meta)
            })
            .collect();
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Attach type and label to one entry. Unknown ids are kept with type
    /// `unknown` and the id as label.
    pub fn enrich_entry(&self, entry: &SubmittedEntry) -> EnrichedEntry {
        match self.fields.get(&entry.field_id) {
            Some(meta) => EnrichedEntry {
                field_id: entry.field_id.clone(),
                field_type: meta.field_type.clone(),
                field_label: meta.label.clone(),
                value: entry.value.clone(),
            },
            None => EnrichedEntry {
                field_id: entry.field_id.clone(),
                field_type: UNKNOWN_FIELD_TYPE.to_string(),
                field_label: entry.field_id.clone(),
                value: entry.value.clone(),
            },
        }
    }

    pub fn enrich(&self, entries: &[SubmittedEntry]) -> Vec<EnrichedEntry> {
        entries.iter().map(|e| self.enrich_entry(e)).collect()
    }
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

/// Who and where the record is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionContext {
    pub form_id: Option<DbId>,
    pub source: String,
}

impl SubmissionContext {
    /// Context for a submission through a published form's public slug.
    pub fn for_form(form_id: DbId, slug: &str) -> Self {
        Self {
            form_id: Some(form_id),
            source: format!("form:{slug}"),
        }
    }
}

/// Output of [`process`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedSubmission {
    pub target: TargetCollection,
    pub record: RoutedRecord,
    pub opt_ins: OptIns,
    /// Visible required fields left empty. Reported, not enforced.
    pub missing_required: Vec<String>,
    /// Group invites whose trigger value was submitted.
    pub group_links: Vec<GroupLink>,
}

/// Enrich, classify and route a submission. The target comes from
/// `settings.collection_target`; content never changes it.
pub fn process(
    form: &Form,
    settings: &FormSettings,
    submission: &SubmittedResponse,
    context: SubmissionContext,
) -> ProcessedSubmission {
    let index = FieldIndex::build(form);
    let entries = index.enrich(&submission.responses);
    let values = submission.values();
    let missing_required = missing_required_fields(form, &values);
    let group_links = matching_group_links(settings, &values);
    let target = settings.collection_target;

    let meta = RecordMeta {
        form_id: context.form_id,
        source: context.source,
        ip_address: submission.metadata.ip_address.clone(),
        user_agent: submission.metadata.user_agent.clone(),
        submitted_at: submission.metadata.submitted_at,
    };

    let outcome = build_record(target, entries, meta, RecordOverrides::default());

    ProcessedSubmission {
        target,
        record: outcome.record,
        opt_ins: outcome.opt_ins,
        missing_required,
        group_links,
    }
}

/// Group links whose field holds the trigger value (or, for multi-value
/// answers, includes it).
pub fn matching_group_links(settings: &FormSettings, values: &FieldValues) -> Vec<GroupLink> {
    settings
        .conditional_group_links
        .iter()
        .filter(|link| match values.get(&link.field_id) {
            Some(Value::Array(items)) => items.iter().any(|v| value_text(v) == link.field_value),
            Some(value) => value_text(value) == link.field_value,
            None => false,
        })
        .cloned()
        .collect()
}

/// Parse `payload` and [`process`] it in one step.
pub fn process_payload(
    form: &Form,
    settings: &FormSettings,
    payload: &Value,
    metadata: SubmissionMetadata,
    context: SubmissionContext,
) -> Result<ProcessedSubmission, CoreError> {
    let submission = SubmittedResponse::from_json(payload, metadata)?;
    Ok(process(form, settings, &submission, context))
}

/// Target for the legacy submission path, which names it with `formType`.
/// Absent or unrecognised values route to leads.
pub fn legacy_target(form_type: Option<&str>) -> TargetCollection {
    form_type
        .and_then(TargetCollection::from_str)
        .unwrap_or_default()
}
