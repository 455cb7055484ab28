//! Generic form response rows.

use formflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `form_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormResponse {
    pub id: DbId,
    pub form_id: Option<DbId>,
    pub responses: serde_json::Value,
    pub source_tag: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: Timestamp,
    pub created_at: Timestamp,
}
