//! Administrative endpoints for the lead and volunteer collections:
//! listing plus bulk status change and bulk deletion by id.

use axum::extract::{Query, State};
use axum::Json;
use formflow_core::error::CoreError;
use formflow_core::records::{LeadStatus, VolunteerStatus};
use formflow_core::types::DbId;
use formflow_db::models::lead::Lead;
use formflow_db::models::volunteer::Volunteer;
use formflow_db::repositories::{LeadRepo, VolunteerRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRecordsParams {
    pub source_tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListRecordsParams {
    fn page(&self) -> (i64, i64) {
        (
            self.limit.unwrap_or(50).clamp(1, 500),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// At most 1000 ids per bulk request.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkStatusRequest {
    #[validate(length(min = 1, max = 1000))]
    pub ids: Vec<DbId>,
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkDeleteRequest {
    #[validate(length(min = 1, max = 1000))]
    pub ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub affected: u64,
}

fn validate_body(body: &impl Validate) -> AppResult<()> {
    body.validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))
}

fn unknown_status(status: &str, allowed: &[&str]) -> AppError {
    AppError::Core(CoreError::Validation(format!(
        "Unknown status '{status}'. Must be one of: {}",
        allowed.join(", ")
    )))
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

/// GET /api/v1/leads
pub async fn list_leads(
    State(state): State<AppState>,
    Query(params): Query<ListRecordsParams>,
) -> AppResult<Json<DataResponse<Vec<Lead>>>> {
    let (limit, offset) = params.page();
    let leads = LeadRepo::list(&state.pool, params.source_tag.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse { data: leads }))
}

/// POST /api/v1/leads/bulk-status
pub async fn bulk_lead_status(
    State(state): State<AppState>,
    Json(input): Json<BulkStatusRequest>,
) -> AppResult<Json<DataResponse<BulkResult>>> {
    validate_body(&input)?;
    let status = LeadStatus::from_str(&input.status)
        .ok_or_else(|| unknown_status(&input.status, LeadStatus::ALL))?;

    let affected = LeadRepo::bulk_update_status(&state.pool, &input.ids, status).await?;
    tracing::info!(
        requested = input.ids.len(),
        affected,
        status = status.as_str(),
        "Bulk lead status change",
    );
    Ok(Json(DataResponse {
        data: BulkResult { affected },
    }))
}

/// POST /api/v1/leads/bulk-delete
pub async fn bulk_delete_leads(
    State(state): State<AppState>,
    Json(input): Json<BulkDeleteRequest>,
) -> AppResult<Json<DataResponse<BulkResult>>> {
    validate_body(&input)?;
    let affected = LeadRepo::bulk_delete(&state.pool, &input.ids).await?;
    tracing::info!(requested = input.ids.len(), affected, "Bulk lead deletion");
    Ok(Json(DataResponse {
        data: BulkResult { affected },
    }))
}

// ---------------------------------------------------------------------------
// Volunteers
// ---------------------------------------------------------------------------

/// GET /api/v1/volunteers
pub async fn list_volunteers(
    State(state): State<AppState>,
    Query(params): Query<ListRecordsParams>,
) -> AppResult<Json<DataResponse<Vec<Volunteer>>>> {
    let (limit, offset) = params.page();
    let volunteers =
        VolunteerRepo::list(&state.pool, params.source_tag.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse { data: volunteers }))
}

/// POST /api/v1/volunteers/bulk-status
pub async fn bulk_volunteer_status(
    State(state): State<AppState>,
    Json(input): Json<BulkStatusRequest>,
) -> AppResult<Json<DataResponse<BulkResult>>> {
    validate_body(&input)?;
    let status = VolunteerStatus::from_str(&input.status)
        .ok_or_else(|| unknown_status(&input.status, VolunteerStatus::ALL))?;

    let affected = VolunteerRepo::bulk_update_status(&state.pool, &input.ids, status).await?;
    tracing::info!(
        requested = input.ids.len(),
        affected,
        status = status.as_str(),
        "Bulk volunteer status change",
    );
    Ok(Json(DataResponse {
        data: BulkResult { affected },
    }))
}

/// POST /api/v1/volunteers/bulk-delete
pub async fn bulk_delete_volunteers(
    State(state): State<AppState>,
    Json(input): Json<BulkDeleteRequest>,
) -> AppResult<Json<DataResponse<BulkResult>>> {
    validate_body(&input)?;
    let affected = VolunteerRepo::bulk_delete(&state.pool, &input.ids).await?;
    tracing::info!(requested = input.ids.len(), affected, "Bulk volunteer deletion");
    Ok(Json(DataResponse {
        data: BulkResult { affected },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_requests_need_ids() {
        let empty = BulkDeleteRequest { ids: vec![] };
        assert!(empty.validate().is_err());

        let ok = BulkStatusRequest {
            ids: vec![1, 2],
            status: "contacted".into(),
        };
        assert!(ok.validate().is_ok());

        let too_many = BulkDeleteRequest {
            ids: (0..1001).collect(),
        };
        assert!(too_many.validate().is_err());
    }
}
