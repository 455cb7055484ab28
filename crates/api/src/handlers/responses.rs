//! Legacy generic submission path.
//!
//! Older embeds post `{formId, formType?, responses}` directly. The target
//! collection comes from `formType` (default `lead`) instead of the form's
//! settings, and no admission checks apply.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use formflow_core::error::CoreError;
use formflow_core::form::FormSettings;
use formflow_core::submission::{legacy_target, process_payload, SubmissionContext};
use formflow_core::types::DbId;
use formflow_db::repositories::{FormRepo, RecordRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::public::{request_metadata, SubmitResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Source recorded on records submitted through this path.
pub const LEGACY_SOURCE: &str = "legacy-submission";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEnvelope {
    #[serde(alias = "form_id")]
    pub form_id: DbId,
    #[serde(default, alias = "form_type")]
    pub form_type: Option<String>,
}

/// POST /api/v1/responses
pub async fn submit_legacy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmitResult>>)> {
    let envelope: LegacyEnvelope = serde_json::from_value(payload.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid submission envelope: {e}")))?;

    let row = FormRepo::find_by_id(&state.pool, envelope.form_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Form",
            id: envelope.form_id,
        }))?;
    let form = row.to_form().map_err(|e| {
        AppError::InternalError(format!("Stored form {} is unreadable: {e}", row.id))
    })?;

    let settings = FormSettings {
        collection_target: legacy_target(envelope.form_type.as_deref()),
        ..form.settings.clone()
    };

    let processed = process_payload(
        &form,
        &settings,
        &payload,
        request_metadata(&headers),
        SubmissionContext {
            form_id: Some(row.id),
            source: LEGACY_SOURCE.to_string(),
        },
    )?;

    let id = RecordRepo::insert(&state.pool, &processed.record).await?;
    tracing::info!(
        form_id = row.id,
        record_id = id,
        collection = %processed.target,
        "Legacy submission stored",
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
