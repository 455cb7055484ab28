//! Form schema types: sections, recursive fields, conditional rules and
//! form-level settings.
//!
//! These are plain data. The JSON shape uses camelCase keys because form
//! documents are authored and submitted by the browser builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::TargetCollection;

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Publication state of a form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
}

impl FormStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete form definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub title: String,
    #[serde(default)]
    pub internal_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Presentation tokens, passed through untouched.
    #[serde(default)]
    pub theme: Value,
    #[serde(default)]
    pub settings: FormSettings,
    #[serde(default)]
    pub status: FormStatus,
}

impl Form {
    /// Sections in render order: ascending `order`, ties kept in array order.
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }

    /// Every field in the form, depth-first, in declaration order.
    pub fn all_fields(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        for section in &self.sections {
            for field in &section.fields {
                collect_fields(field, &mut out);
            }
        }
        out
    }

    /// Find a field anywhere in the tree by id.
    pub fn find_field(&self, field_id: &str) -> Option<&Field> {
        self.all_fields().into_iter().find(|f| f.id == field_id)
    }
}

fn collect_fields<'a>(field: &'a Field, out: &mut Vec<&'a Field>) {
    out.push(field);
    for child in &field.nested_fields {
        collect_fields(child, out);
    }
}

// ---------------------------------------------------------------------------
// Section / Field
// ---------------------------------------------------------------------------

/// An ordered group of fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub conditional_rules: Vec<ConditionalRule>,
}

impl Section {
    /// Fields in render order: ascending `order`, ties kept in array order.
    pub fn ordered_fields(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }
}

/// A single input definition. Fields own their nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub conditional_rules: Vec<ConditionalRule>,
    #[serde(default)]
    pub nested_fields: Vec<Field>,
}

impl Field {
    /// Nested fields in render order.
    pub fn ordered_nested(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.nested_fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }
}

/// The supported field input types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    HierarchySelector,
    File,
    WhatsappConsent,
    VolunteerConsent,
    ReadOnlyText,
    SourcePicker,
}

impl FieldType {
    /// Stable string representation matching serde's `rename_all = "kebab-case"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::HierarchySelector => "hierarchy-selector",
            Self::File => "file",
            Self::WhatsappConsent => "whatsapp-consent",
            Self::VolunteerConsent => "volunteer-consent",
            Self::ReadOnlyText => "read-only-text",
            Self::SourcePicker => "source-picker",
        }
    }

    /// Types whose value must be one of the declared options.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }

    /// Consent toggles surfaced as opt-in flags.
    pub fn is_consent(&self) -> bool {
        matches!(self, Self::WhatsappConsent | Self::VolunteerConsent)
    }

    /// Read-only text is display-only and never carries a value.
    pub fn accepts_input(&self) -> bool {
        !matches!(self, Self::ReadOnlyText)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable option. Accepts either a bare string or `{label, value}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldOption")]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldOption {
    Plain(String),
    Labelled {
        label: String,
        #[serde(default)]
        value: Option<String>,
    },
}

impl From<RawFieldOption> for FieldOption {
    fn from(raw: RawFieldOption) -> Self {
        match raw {
            RawFieldOption::Plain(s) => Self {
                label: s.clone(),
                value: s,
            },
            RawFieldOption::Labelled { label, value } => Self {
                value: value.unwrap_or_else(|| label.clone()),
                label,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Conditional rules
// ---------------------------------------------------------------------------

/// Comparison applied to the target field's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// What a matching rule does to the field or section it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Show,
    Hide,
    Enable,
    Disable,
}

/// A declarative directive keyed to another field's value. The rule lives
/// on the field or section it controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    pub target_field_id: String,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: Value,
    pub action: RuleAction,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Post-submission group invite shown when a field has a given value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLink {
    pub field_id: String,
    pub field_value: String,
    pub platform: String,
    pub group_link: String,
}

/// Form-level behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSettings {
    #[serde(default)]
    pub collection_target: TargetCollection,
    #[serde(default = "default_true")]
    pub allow_multiple_responses: bool,
    #[serde(default)]
    pub max_responses: Option<u32>,
    #[serde(default)]
    pub custom_slug: Option<String>,
    #[serde(default)]
    pub accept_payments: bool,
    #[serde(default)]
    pub payment_amount: Option<f64>,
    #[serde(default)]
    pub conditional_group_links: Vec<GroupLink>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            collection_target: TargetCollection::default(),
            allow_multiple_responses: true,
            max_responses: None,
            custom_slug: None,
            accept_payments: false,
            payment_amount: None,
            conditional_group_links: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}
