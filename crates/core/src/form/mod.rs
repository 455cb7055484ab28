//! Form schema, structural validation and the conditional visibility
//! evaluator. No database access, no async.

pub mod schema;
pub mod validate;
pub mod visibility;

pub use schema::{
    ConditionalRule, Field, FieldOption, FieldType, Form, FormSettings, FormStatus, GroupLink,
    RuleAction, RuleOperator, Section,
};
pub use validate::{dangling_rule_references, slugify, validate_form, SchemaViolation};
pub use visibility::{evaluate_form, visible_field_ids, FieldValues, FormEvaluation};
