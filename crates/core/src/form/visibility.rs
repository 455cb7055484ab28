//! Conditional visibility evaluator: pure logic, no state between calls.
//!
//! Rules on a field or section are evaluated in declaration order and the
//! last matching rule wins. A holder whose rules include a `show` action
//! starts hidden (it is shown *when* something matches); otherwise it starts
//! visible. `enable`/`disable` work the same way on a separate axis and never
//! affect visibility.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use serde_json::Value;

use super::schema::{ConditionalRule, Field, Form, RuleAction, RuleOperator};

/// Current field values keyed by field id. Missing keys mean "no value yet".
pub type FieldValues = serde_json::Map<String, Value>;

/// Result of evaluating every rule in a form against a set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormEvaluation {
    pub visible_sections: BTreeSet<String>,
    pub visible_fields: BTreeSet<String>,
    pub disabled_fields: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RuleOutcome {
    visible: bool,
    enabled: bool,
}

/// Ids of every field that is currently visible.
///
/// A nested field is visible only if its parent is visible and its own
/// rules pass. Fields in a hidden section are hidden.
pub fn visible_field_ids(form: &Form, values: &FieldValues) -> BTreeSet<String> {
    evaluate_form(form, values).visible_fields
}

/// Evaluate section and field rules for the whole form.
pub fn evaluate_form(form: &Form, values: &FieldValues) -> FormEvaluation {
    let known: HashSet<&str> = form.all_fields().iter().map(|f| f.id.as_str()).collect();
    let mut evaluation = FormEvaluation::default();

    for section in form.ordered_sections() {
        let outcome = evaluate_rules(&section.conditional_rules, values, &known);
        if !outcome.visible {
            continue;
        }
        evaluation.visible_sections.insert(section.id.clone());
        for field in section.ordered_fields() {
            visit_field(field, values, &known, &mut evaluation);
        }
    }

    evaluation
}

fn visit_field(
    field: &Field,
    values: &FieldValues,
    known: &HashSet<&str>,
    evaluation: &mut FormEvaluation,
) {
    let outcome = evaluate_rules(&field.conditional_rules, values, known);
    if !outcome.visible {
        return;
    }
    evaluation.visible_fields.insert(field.id.clone());
    if !outcome.enabled {
        evaluation.disabled_fields.insert(field.id.clone());
    }
    for child in field.ordered_nested() {
        visit_field(child, values, known, evaluation);
    }
}

fn evaluate_rules(
    rules: &[ConditionalRule],
    values: &FieldValues,
    known: &HashSet<&str>,
) -> RuleOutcome {
    let mut outcome = RuleOutcome {
        visible: !rules.iter().any(|r| r.action == RuleAction::Show),
        enabled: !rules.iter().any(|r| r.action == RuleAction::Enable),
    };

    for rule in rules {
        if !rule_matches(rule, values, known) {
            continue;
        }
        match rule.action {
            RuleAction::Show => outcome.visible = true,
            RuleAction::Hide => outcome.visible = false,
            RuleAction::Enable => outcome.enabled = true,
            RuleAction::Disable => outcome.enabled = false,
        }
    }

    outcome
}

/// Whether a single rule matches the current values.
///
/// A rule targeting a field id outside `known` never matches.
fn rule_matches(rule: &ConditionalRule, values: &FieldValues, known: &HashSet<&str>) -> bool {
    if !known.contains(rule.target_field_id.as_str()) {
        return false;
    }
    let actual = values.get(&rule.target_field_id).unwrap_or(&Value::Null);
    let expected = value_text(&rule.value);

    match rule.operator {
        RuleOperator::Equals => text_equals(actual, &expected),
        RuleOperator::NotEquals => !text_equals(actual, &expected),
        RuleOperator::Contains => text_contains(actual, &expected),
        RuleOperator::GreaterThan => match (numeric(actual), numeric(&rule.value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        RuleOperator::LessThan => match (numeric(actual), numeric(&rule.value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    }
}

/// Multi-value answers (checkbox groups) match if any selected item does.
fn text_equals(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| value_text(item) == expected),
        other => value_text(other) == expected,
    }
}

fn text_contains(actual: &Value, needle: &str) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| value_text(item).contains(needle)),
        other => value_text(other).contains(needle),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Raw string form of a value, used for every text comparison.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// `true` for null, blank strings and empty arrays.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Required fields that are visible and enabled but have no value.
pub fn missing_required_fields(form: &Form, values: &FieldValues) -> Vec<String> {
    let evaluation = evaluate_form(form, values);
    form.all_fields()
        .into_iter()
        .filter(|f| f.required && f.field_type.accepts_input())
        .filter(|f| evaluation.visible_fields.contains(&f.id))
        .filter(|f| !evaluation.disabled_fields.contains(&f.id))
        .filter(|f| values.get(&f.id).map_or(true, is_empty_value))
        .map(|f| f.id.clone())
        .collect()
}
