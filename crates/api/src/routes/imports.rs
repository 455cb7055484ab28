//! Route definitions for bulk imports, mounted at `/imports`.
//!
//! The upload body limit is applied in [`crate::router::build_app_router`]
//! since it comes from configuration.

use axum::routing::get;
use axum::Router;

use crate::handlers::imports;
use crate::state::AppState;

/// ```text
/// GET    /                  -> list_imports
/// POST   /                  -> create_import (multipart, 202)
/// GET    /{id}              -> get_import
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(imports::list_imports).post(imports::create_import))
        .route("/{id}", get(imports::get_import))
}
