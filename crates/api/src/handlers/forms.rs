//! Handlers for the `/forms` resource: authoring, publishing and the
//! stateless preview endpoints the form builder uses.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use formflow_core::error::CoreError;
use formflow_core::form::validate::DanglingRuleReference;
use formflow_core::form::{
    dangling_rule_references, evaluate_form, slugify, validate_form, FieldValues, Form,
    FormEvaluation, SchemaViolation,
};
use formflow_core::submission::{
    process_payload, ProcessedSubmission, SubmissionContext, SubmissionMetadata,
};
use formflow_core::types::DbId;
use formflow_db::models::form::{FormRow, SaveForm};
use formflow_db::models::response::FormResponse;
use formflow_db::repositories::{FormRepo, ResponseRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Source recorded on records built by the submission preview.
const PREVIEW_SOURCE: &str = "preview";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject a schema with structural violations; log dangling rule targets.
fn ensure_valid(form: &Form) -> AppResult<SaveForm> {
    if let Err(violations) = validate_form(form) {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AppError::Core(CoreError::Validation(message)));
    }

    let dangling = dangling_rule_references(form);
    if !dangling.is_empty() {
        tracing::debug!(
            count = dangling.len(),
            title = %form.title,
            "Form has rules referencing unknown fields",
        );
    }

    SaveForm::from_form(form).map_err(|e| AppError::InternalError(e.to_string()))
}

fn form_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Form", id })
}

/// Slug a form is published under: its custom slug, else one derived
/// from the title.
fn publish_slug(form: &Form) -> String {
    form.settings
        .custom_slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slugify(&form.title))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/forms
pub async fn list_forms(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<FormRow>>>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);
    let forms = FormRepo::list(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: forms }))
}

/// POST /api/v1/forms
///
/// Create a draft form. The schema is validated before it is stored.
pub async fn create_form(
    State(state): State<AppState>,
    Json(form): Json<Form>,
) -> AppResult<(StatusCode, Json<DataResponse<FormRow>>)> {
    let body = ensure_valid(&form)?;
    let row = FormRepo::create(&state.pool, &body).await?;
    tracing::info!(form_id = row.id, title = %row.title, "Form created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

/// GET /api/v1/forms/{id}
pub async fn get_form(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FormRow>>> {
    let row = FormRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| form_not_found(id))?;
    Ok(Json(DataResponse { data: row }))
}

/// PUT /api/v1/forms/{id}
///
/// Replace the schema and settings. A published form stays published and
/// follows a changed `customSlug` (409 if another published form has it).
pub async fn update_form(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(form): Json<Form>,
) -> AppResult<Json<DataResponse<FormRow>>> {
    let body = ensure_valid(&form)?;
    let row = FormRepo::update(&state.pool, id, &body, &publish_slug(&form))
        .await?
        .ok_or_else(|| form_not_found(id))?;
    tracing::info!(form_id = id, slug = ?row.slug, "Form updated");
    Ok(Json(DataResponse { data: row }))
}

/// POST /api/v1/forms/{id}/publish
///
/// Publish under the form's slug. A slug already used by another
/// published form is rejected by the database (409).
pub async fn publish_form(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FormRow>>> {
    let row = FormRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| form_not_found(id))?;
    let form = row
        .to_form()
        .map_err(|e| AppError::InternalError(format!("Stored form {id} is unreadable: {e}")))?;

    let slug = publish_slug(&form);
    let row = FormRepo::publish(&state.pool, id, &slug)
        .await?
        .ok_or_else(|| form_not_found(id))?;
    tracing::info!(form_id = id, slug = %slug, "Form published");
    Ok(Json(DataResponse { data: row }))
}

/// GET /api/v1/forms/{id}/responses
///
/// Generic-collection responses stored for a form.
pub async fn list_form_responses(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<FormResponse>>>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);
    let responses = ResponseRepo::list_for_form(&state.pool, id, limit, offset).await?;
    Ok(Json(DataResponse { data: responses }))
}

// ---------------------------------------------------------------------------
// Stateless previews
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ViolationEntry {
    #[serde(flatten)]
    pub violation: SchemaViolation,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub violations: Vec<ViolationEntry>,
    /// Rules pointing at unknown fields. They never match; not an error.
    pub warnings: Vec<DanglingRuleReference>,
}

/// POST /api/v1/forms/validate
///
/// Validate a schema without storing it. Structural problems are reported
/// in the body, not as an error status.
pub async fn validate_schema(Json(form): Json<Form>) -> Json<DataResponse<SchemaReport>> {
    let violations: Vec<ViolationEntry> = validate_form(&form)
        .err()
        .unwrap_or_default()
        .into_iter()
        .map(|violation| ViolationEntry {
            message: violation.to_string(),
            violation,
        })
        .collect();

    Json(DataResponse {
        data: SchemaReport {
            valid: violations.is_empty(),
            violations,
            warnings: dangling_rule_references(&form),
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct VisibilityPreviewRequest {
    pub form: Form,
    #[serde(default)]
    pub values: FieldValues,
}

/// POST /api/v1/forms/preview/visibility
pub async fn preview_visibility(
    Json(input): Json<VisibilityPreviewRequest>,
) -> Json<DataResponse<FormEvaluation>> {
    Json(DataResponse {
        data: evaluate_form(&input.form, &input.values),
    })
}

#[derive(Debug, Deserialize)]
pub struct SubmissionPreviewRequest {
    pub form: Form,
    /// The submission payload exactly as the renderer would send it.
    pub submission: serde_json::Value,
}

/// POST /api/v1/forms/preview/submission
///
/// Run the submission processor on an inline schema. Nothing is stored.
pub async fn preview_submission(
    Json(input): Json<SubmissionPreviewRequest>,
) -> AppResult<Json<DataResponse<ProcessedSubmission>>> {
    let processed = process_payload(
        &input.form,
        &input.form.settings,
        &input.submission,
        SubmissionMetadata::default(),
        SubmissionContext {
            form_id: None,
            source: PREVIEW_SOURCE.to_string(),
        },
    )?;
    Ok(Json(DataResponse { data: processed }))
}
