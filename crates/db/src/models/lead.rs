//! Lead rows.

use formflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `leads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: DbId,
    pub form_id: Option<DbId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub region: String,
    pub district: String,
    pub block: String,
    pub unit: String,
    pub lead_score: i32,
    pub status: String,
    pub whatsapp_opt_in: bool,
    pub volunteer_opt_in: bool,
    pub responses: serde_json::Value,
    pub source_tag: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
