//! Repository for the `leads` table.

use formflow_core::admission::SubmitterKey;
use formflow_core::records::{LeadRecord, LeadStatus};
use formflow_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::lead::Lead;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, form_id, name, email, phone, region, district, block, unit, \
    lead_score, status, whatsapp_opt_in, volunteer_opt_in, responses, source_tag, \
    ip_address, user_agent, submitted_at, created_at, updated_at";

/// Provides persistence and admin operations for leads.
pub struct LeadRepo;

impl LeadRepo {
    /// Insert a routed lead record, returning the created row.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        record: &LeadRecord,
    ) -> Result<Lead, sqlx::Error> {
        let query = format!(
            "INSERT INTO leads \
                (form_id, name, email, phone, region, district, block, unit, lead_score, \
                 status, whatsapp_opt_in, volunteer_opt_in, responses, source_tag, \
                 ip_address, user_agent, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(record.meta.form_id)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(&record.hierarchy.region)
            .bind(&record.hierarchy.district)
            .bind(&record.hierarchy.block)
            .bind(&record.hierarchy.unit)
            .bind(record.lead_score)
            .bind(record.status.as_str())
            .bind(record.whatsapp_opt_in)
            .bind(record.volunteer_opt_in)
            .bind(Json(&record.responses))
            .bind(&record.meta.source)
            .bind(&record.meta.ip_address)
            .bind(&record.meta.user_agent)
            .bind(record.meta.submitted_at)
            .fetch_one(executor)
            .await
    }

    /// Find a single lead by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE id = $1");
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List leads, newest first, optionally limited to one source tag.
    pub async fn list(
        pool: &PgPool,
        source_tag: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM leads \
             WHERE ($1::TEXT IS NULL OR source_tag = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(source_tag)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete every lead carrying `source_tag`. Returns the number removed.
    pub async fn delete_by_source_tag(pool: &PgPool, source_tag: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leads WHERE source_tag = $1")
            .bind(source_tag)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Set the status of every listed lead. Returns the number updated.
    pub async fn bulk_update_status(
        pool: &PgPool,
        ids: &[DbId],
        status: LeadStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE leads SET status = $2, updated_at = now() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every listed lead. Returns the number removed.
    pub async fn bulk_delete(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of leads submitted through a form.
    pub async fn count_for_form(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE form_id = $1")
            .bind(form_id)
            .fetch_one(executor)
            .await
    }

    /// Whether this submitter already has a lead for the form.
    pub async fn submitter_exists(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
        key: &SubmitterKey,
    ) -> Result<bool, sqlx::Error> {
        let (condition, value) = match key {
            SubmitterKey::Email(email) => ("lower(email) = $2", email),
            SubmitterKey::IpAddress(ip) => ("ip_address = $2", ip),
        };
        let query =
            format!("SELECT EXISTS(SELECT 1 FROM leads WHERE form_id = $1 AND {condition})");
        sqlx::query_scalar(&query)
            .bind(form_id)
            .bind(value)
            .fetch_one(executor)
            .await
    }
}
