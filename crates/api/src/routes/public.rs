use axum::routing::{get, post};
use axum::Router;

use crate::handlers::public;
use crate::state::AppState;

/// Respondent-facing routes mounted at `/public/forms`.
///
/// ```text
/// GET    /{slug}                    -> get_public_form
/// POST   /{slug}/visibility         -> evaluate_visibility
/// POST   /{slug}/submit             -> submit
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{slug}", get(public::get_public_form))
        .route("/{slug}/visibility", post(public::evaluate_visibility))
        .route("/{slug}/submit", post(public::submit))
}
