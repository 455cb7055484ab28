//! Structural validation of a form schema, run when a form is saved or
//! loaded for publication.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::schema::{Field, Form};

/// Maximum depth of `nestedFields` below a section's top-level field.
pub const MAX_NESTING_DEPTH: usize = 8;

/// A single structural problem in a form schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaViolation {
    EmptyTitle,
    EmptySectionId,
    DuplicateSectionId { section_id: String },
    EmptyFieldId { section_id: String },
    DuplicateFieldId { field_id: String },
    FieldIsOwnAncestor { field_id: String },
    NestingTooDeep { field_id: String, depth: usize },
    MissingOptions { field_id: String },
    InvalidSlug { slug: String },
    InvalidPaymentAmount,
    InvalidMaxResponses,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Form title must not be empty"),
            Self::EmptySectionId => write!(f, "Section id must not be empty"),
            Self::DuplicateSectionId { section_id } => {
                write!(f, "Duplicate section id '{section_id}'")
            }
            Self::EmptyFieldId { section_id } => {
                write!(f, "Field in section '{section_id}' has an empty id")
            }
            Self::DuplicateFieldId { field_id } => write!(f, "Duplicate field id '{field_id}'"),
            Self::FieldIsOwnAncestor { field_id } => {
                write!(f, "Field '{field_id}' appears among its own ancestors")
            }
            Self::NestingTooDeep { field_id, depth } => write!(
                f,
                "Field '{field_id}' is nested {depth} levels deep (max {MAX_NESTING_DEPTH})"
            ),
            Self::MissingOptions { field_id } => {
                write!(f, "Choice field '{field_id}' has no options")
            }
            Self::InvalidSlug { slug } => write!(
                f,
                "Slug '{slug}' must be lowercase letters, digits and single hyphens"
            ),
            Self::InvalidPaymentAmount => {
                write!(f, "Payment amount must be greater than zero when payments are accepted")
            }
            Self::InvalidMaxResponses => write!(f, "Max responses must be greater than zero"),
        }
    }
}

/// A conditional rule pointing at a field id that does not exist.
///
/// Not an error: such rules simply never match at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRuleReference {
    /// The section or field carrying the rule.
    pub owner_id: String,
    pub target_field_id: String,
}

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

/// Returns `true` if `slug` is usable as a public form slug.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Derive a public slug from a title: lowercase ASCII letters and digits
/// joined by single hyphens. Falls back to `form` when nothing is left.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "form".to_string()
    } else {
        slug.to_string()
    }
}

/// Validate the structure of a form. Collects every violation rather than
/// stopping at the first.
pub fn validate_form(form: &Form) -> Result<(), Vec<SchemaViolation>> {
    let mut violations = Vec::new();

    if form.title.trim().is_empty() {
        violations.push(SchemaViolation::EmptyTitle);
    }

    let mut section_ids = HashSet::new();
    let mut field_ids = HashSet::new();

    for section in &form.sections {
        if section.id.trim().is_empty() {
            violations.push(SchemaViolation::EmptySectionId);
        } else if !section_ids.insert(section.id.as_str()) {
            violations.push(SchemaViolation::DuplicateSectionId {
                section_id: section.id.clone(),
            });
        }

        for field in &section.fields {
            let mut ancestors = Vec::new();
            check_field(
                field,
                &section.id,
                0,
                &mut ancestors,
                &mut field_ids,
                &mut violations,
            );
        }
    }

    let settings = &form.settings;
    if let Some(slug) = &settings.custom_slug {
        if !is_valid_slug(slug) {
            violations.push(SchemaViolation::InvalidSlug { slug: slug.clone() });
        }
    }
    if settings.accept_payments && !settings.payment_amount.is_some_and(|a| a > 0.0) {
        violations.push(SchemaViolation::InvalidPaymentAmount);
    }
    if settings.max_responses == Some(0) {
        violations.push(SchemaViolation::InvalidMaxResponses);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_field<'a>(
    field: &'a Field,
    section_id: &str,
    depth: usize,
    ancestors: &mut Vec<&'a str>,
    seen: &mut HashSet<&'a str>,
    violations: &mut Vec<SchemaViolation>,
) {
    if field.id.trim().is_empty() {
        violations.push(SchemaViolation::EmptyFieldId {
            section_id: section_id.to_string(),
        });
    } else if ancestors.contains(&field.id.as_str()) {
        violations.push(SchemaViolation::FieldIsOwnAncestor {
            field_id: field.id.clone(),
        });
        // A repeated ancestor id would also be reported as a duplicate below;
        // one violation is enough.
        return;
    } else if !seen.insert(field.id.as_str()) {
        violations.push(SchemaViolation::DuplicateFieldId {
            field_id: field.id.clone(),
        });
    }

    if depth > MAX_NESTING_DEPTH {
        violations.push(SchemaViolation::NestingTooDeep {
            field_id: field.id.clone(),
            depth,
        });
        return;
    }

    if field.field_type.is_choice() && field.options.is_empty() {
        violations.push(SchemaViolation::MissingOptions {
            field_id: field.id.clone(),
        });
    }

    ancestors.push(field.id.as_str());
    for child in &field.nested_fields {
        check_field(child, section_id, depth + 1, ancestors, seen, violations);
    }
    ancestors.pop();
}

/// List conditional rules whose `targetFieldId` is not a field of this form.
pub fn dangling_rule_references(form: &Form) -> Vec<DanglingRuleReference> {
    let known: HashSet<&str> = form.all_fields().iter().map(|f| f.id.as_str()).collect();
    let mut dangling = Vec::new();

    let mut check = |owner_id: &str, rules: &[super::schema::ConditionalRule]| {
        for rule in rules {
            if !known.contains(rule.target_field_id.as_str()) {
                dangling.push(DanglingRuleReference {
                    owner_id: owner_id.to_string(),
                    target_field_id: rule.target_field_id.clone(),
                });
            }
        }
    };

    for section in &form.sections {
        check(&section.id, &section.conditional_rules);
    }
    for field in form.all_fields() {
        check(&field.id, &field.conditional_rules);
    }

    dangling
}
