//! Route definitions for the lead and volunteer collections.
//!
//! Two routers are provided:
//! - `leads_router()` mounted at `/leads`
//! - `volunteers_router()` mounted at `/volunteers`

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::records;
use crate::state::AppState;

/// ```text
/// GET    /                  -> list_leads
/// POST   /bulk-status       -> bulk_lead_status
/// POST   /bulk-delete       -> bulk_delete_leads
/// ```
pub fn leads_router() -> Router<AppState> {
    Router::new()
        .route("/", get(records::list_leads))
        .route("/bulk-status", post(records::bulk_lead_status))
        .route("/bulk-delete", post(records::bulk_delete_leads))
}

/// ```text
/// GET    /                  -> list_volunteers
/// POST   /bulk-status       -> bulk_volunteer_status
/// POST   /bulk-delete       -> bulk_delete_volunteers
/// ```
pub fn volunteers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(records::list_volunteers))
        .route("/bulk-status", post(records::bulk_volunteer_status))
        .route("/bulk-delete", post(records::bulk_delete_volunteers))
}
