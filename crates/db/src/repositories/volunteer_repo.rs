//! Repository for the `volunteers` table.

use formflow_core::admission::SubmitterKey;
use formflow_core::records::{VolunteerRecord, VolunteerStatus};
use formflow_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::volunteer::Volunteer;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, form_id, name, email, phone, region, district, block, unit, \
    status, responses, source_tag, ip_address, user_agent, submitted_at, created_at, updated_at";

/// Provides persistence and admin operations for volunteers.
pub struct VolunteerRepo;

impl VolunteerRepo {
    /// Insert a routed volunteer record, returning the created row.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        record: &VolunteerRecord,
    ) -> Result<Volunteer, sqlx::Error> {
        let query = format!(
            "INSERT INTO volunteers \
                (form_id, name, email, phone, region, district, block, unit, status, \
                 responses, source_tag, ip_address, user_agent, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Volunteer>(&query)
            .bind(record.meta.form_id)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(&record.hierarchy.region)
            .bind(&record.hierarchy.district)
            .bind(&record.hierarchy.block)
            .bind(&record.hierarchy.unit)
            .bind(record.status.as_str())
            .bind(Json(&record.responses))
            .bind(&record.meta.source)
            .bind(&record.meta.ip_address)
            .bind(&record.meta.user_agent)
            .bind(record.meta.submitted_at)
            .fetch_one(executor)
            .await
    }

    /// Find a single volunteer by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Volunteer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM volunteers WHERE id = $1");
        sqlx::query_as::<_, Volunteer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List volunteers, newest first, optionally limited to one source tag.
    pub async fn list(
        pool: &PgPool,
        source_tag: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Volunteer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM volunteers \
             WHERE ($1::TEXT IS NULL OR source_tag = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Volunteer>(&query)
            .bind(source_tag)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete every volunteer carrying `source_tag`. Returns the number removed.
    pub async fn delete_by_source_tag(pool: &PgPool, source_tag: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM volunteers WHERE source_tag = $1")
            .bind(source_tag)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Set the status of every listed volunteer. Returns the number updated.
    pub async fn bulk_update_status(
        pool: &PgPool,
        ids: &[DbId],
        status: VolunteerStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE volunteers SET status = $2, updated_at = now() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every listed volunteer. Returns the number removed.
    pub async fn bulk_delete(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM volunteers WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of volunteers registered through a form.
    pub async fn count_for_form(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM volunteers WHERE form_id = $1")
            .bind(form_id)
            .fetch_one(executor)
            .await
    }

    /// Whether this submitter already registered through the form.
    pub async fn submitter_exists(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
        key: &SubmitterKey,
    ) -> Result<bool, sqlx::Error> {
        let (condition, value) = match key {
            SubmitterKey::Email(email) => ("lower(email) = $2", email),
            SubmitterKey::IpAddress(ip) => ("ip_address = $2", ip),
        };
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM volunteers WHERE form_id = $1 AND {condition})"
        );
        sqlx::query_scalar(&query)
            .bind(form_id)
            .bind(value)
            .fetch_one(executor)
            .await
    }
}
