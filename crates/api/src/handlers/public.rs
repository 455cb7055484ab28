//! Public (respondent-facing) form endpoints, addressed by slug.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use formflow_core::admission::{check_admission, SubmitterKey};
use formflow_core::classify::OptIns;
use formflow_core::form::{
    evaluate_form, FieldValues, Form, FormEvaluation, FormSettings, GroupLink,
};
use formflow_core::records::TargetCollection;
use formflow_core::submission::{
    process, ProcessedSubmission, SubmissionContext, SubmissionMetadata, SubmittedResponse,
};
use formflow_core::types::DbId;
use formflow_db::repositories::{FormRepo, RecordRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A published form as served to respondents.
#[derive(Debug, Serialize)]
pub struct PublicForm {
    pub id: DbId,
    pub slug: String,
    pub form: Form,
}

/// Outcome of a stored submission.
#[derive(Debug, Serialize)]
pub struct SubmitResult {
    pub id: DbId,
    pub collection: TargetCollection,
    pub opt_ins: OptIns,
    pub missing_required: Vec<String>,
    pub group_links: Vec<GroupLink>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    #[serde(default)]
    pub values: FieldValues,
}

/// Client IP and user agent from the request headers. The first
/// `X-Forwarded-For` hop wins over `X-Real-IP`.
pub fn request_metadata(headers: &HeaderMap) -> SubmissionMetadata {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let ip_address = header_text("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_text("x-real-ip"));

    SubmissionMetadata {
        ip_address,
        user_agent: header_text(header::USER_AGENT.as_str()),
        ..Default::default()
    }
}

async fn load_published(state: &AppState, slug: &str) -> AppResult<(DbId, Form)> {
    let row = FormRepo::find_published_by_slug(&state.pool, slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No published form with slug '{slug}'")))?;
    let form = row.to_form().map_err(|e| {
        AppError::InternalError(format!("Stored form {} is unreadable: {e}", row.id))
    })?;
    Ok((row.id, form))
}

/// Run admission checks for `processed` against the stored collection.
///
/// Must run inside the transaction that stores the record, after
/// [`RecordRepo::lock_form_admissions`].
async fn admit(
    conn: &mut PgConnection,
    form_id: DbId,
    form: &Form,
    settings: &FormSettings,
    processed: &ProcessedSubmission,
    metadata: &SubmissionMetadata,
) -> AppResult<()> {
    let target = processed.target;
    let existing = RecordRepo::count_for_form(&mut *conn, target, form_id).await?;

    let prior_from_submitter = if settings.allow_multiple_responses {
        false
    } else {
        match SubmitterKey::resolve(processed.record.email(), metadata.ip_address.as_deref()) {
            Some(key) => RecordRepo::submitter_exists(&mut *conn, target, form_id, &key).await?,
            None => false,
        }
    };

    check_admission(
        settings,
        form.status,
        u64::try_from(existing).unwrap_or(0),
        prior_from_submitter,
    )?;
    Ok(())
}

/// GET /api/v1/public/forms/{slug}
pub async fn get_public_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<PublicForm>>> {
    let (id, form) = load_published(&state, &slug).await?;
    Ok(Json(DataResponse {
        data: PublicForm { id, slug, form },
    }))
}

/// POST /api/v1/public/forms/{slug}/visibility
///
/// Re-evaluated by the renderer after every value change.
pub async fn evaluate_visibility(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<VisibilityRequest>,
) -> AppResult<Json<DataResponse<FormEvaluation>>> {
    let (_, form) = load_published(&state, &slug).await?;
    Ok(Json(DataResponse {
        data: evaluate_form(&form, &input.values),
    }))
}

/// POST /api/v1/public/forms/{slug}/submit
///
/// Process a submission and store it in the form's target collection.
pub async fn submit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmitResult>>)> {
    let (form_id, form) = load_published(&state, &slug).await?;
    let metadata = request_metadata(&headers);
    let submission = SubmittedResponse::from_json(&payload, metadata.clone())?;

    let settings = form.settings.clone();
    let processed = process(
        &form,
        &settings,
        &submission,
        SubmissionContext::for_form(form_id, &slug),
    );

    let mut tx = state.pool.begin().await?;
    RecordRepo::lock_form_admissions(&mut *tx, form_id).await?;
    admit(&mut *tx, form_id, &form, &settings, &processed, &metadata).await?;
    let id = RecordRepo::insert(&mut *tx, &processed.record).await?;
    tx.commit().await?;

    tracing::info!(
        form_id,
        record_id = id,
        collection = %processed.target,
        missing_required = processed.missing_required.len(),
        "Submission stored",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmitResult {
                id,
                collection: processed.target,
                opt_ins: processed.opt_ins,
                missing_required: processed.missing_required,
                group_links: processed.group_links,
            },
        }),
    ))
}
