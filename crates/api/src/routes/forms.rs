//! Route definitions for form authoring, mounted at `/forms`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::forms;
use crate::state::AppState;

/// ```text
/// GET    /                          -> list_forms
/// POST   /                          -> create_form
/// POST   /validate                  -> validate_schema
/// POST   /preview/visibility        -> preview_visibility
/// POST   /preview/submission        -> preview_submission
/// GET    /{id}                      -> get_form
/// PUT    /{id}                      -> update_form
/// POST   /{id}/publish              -> publish_form
/// GET    /{id}/responses            -> list_form_responses
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(forms::list_forms).post(forms::create_form))
        .route("/validate", post(forms::validate_schema))
        .route("/preview/visibility", post(forms::preview_visibility))
        .route("/preview/submission", post(forms::preview_submission))
        .route("/{id}", get(forms::get_form).put(forms::update_form))
        .route("/{id}/publish", post(forms::publish_form))
        .route("/{id}/responses", get(forms::list_form_responses))
}
