use axum::routing::post;
use axum::Router;

use crate::handlers::responses;
use crate::state::AppState;

/// Legacy submission route mounted at `/responses`.
///
/// ```text
/// POST   /                          -> submit_legacy
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(responses::submit_legacy))
}
