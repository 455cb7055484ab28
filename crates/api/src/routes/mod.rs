pub mod forms;
pub mod health;
pub mod imports;
pub mod public;
pub mod records;
pub mod responses;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /forms                                 list, create
/// /forms/validate                        validate a schema (POST)
/// /forms/preview/visibility              evaluate an inline schema (POST)
/// /forms/preview/submission              process without storing (POST)
/// /forms/{id}                            get, update
/// /forms/{id}/publish                    publish under its slug (POST)
/// /forms/{id}/responses                  generic responses (GET)
///
/// /public/forms/{slug}                   published form (GET)
/// /public/forms/{slug}/visibility        evaluate visibility (POST)
/// /public/forms/{slug}/submit            store a submission (POST)
///
/// /responses                             legacy submission path (POST)
///
/// /imports                               list, upload (POST, 202)
/// /imports/{id}                          job progress (GET)
///
/// /leads                                 list
/// /leads/bulk-status                     bulk status change (POST)
/// /leads/bulk-delete                     bulk delete (POST)
///
/// /volunteers                            list
/// /volunteers/bulk-status                bulk status change (POST)
/// /volunteers/bulk-delete                bulk delete (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Form authoring and previews.
        .nest("/forms", forms::router())
        // Respondent-facing endpoints, addressed by slug.
        .nest("/public/forms", public::router())
        // Older embeds posting `{formId, responses}`.
        .nest("/responses", responses::router())
        // Bulk import upload and polling.
        .nest("/imports", imports::router())
        // Administrative record management.
        .nest("/leads", records::leads_router())
        .nest("/volunteers", records::volunteers_router())
}
