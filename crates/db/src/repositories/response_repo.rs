//! Repository for the `form_responses` table (generic collection).

use formflow_core::admission::SubmitterKey;
use formflow_core::records::GenericRecord;
use formflow_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::response::FormResponse;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, form_id, responses, source_tag, ip_address, user_agent, submitted_at, created_at";

/// Provides persistence for generic form responses.
pub struct ResponseRepo;

impl ResponseRepo {
    /// Insert a generic record, returning the created row.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        record: &GenericRecord,
    ) -> Result<FormResponse, sqlx::Error> {
        let query = format!(
            "INSERT INTO form_responses \
                (form_id, responses, source_tag, ip_address, user_agent, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormResponse>(&query)
            .bind(record.meta.form_id)
            .bind(Json(&record.responses))
            .bind(&record.meta.source)
            .bind(&record.meta.ip_address)
            .bind(&record.meta.user_agent)
            .bind(record.meta.submitted_at)
            .fetch_one(executor)
            .await
    }

    /// List responses for a form, newest first.
    pub async fn list_for_form(
        pool: &PgPool,
        form_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FormResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM form_responses WHERE form_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, FormResponse>(&query)
            .bind(form_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete every response carrying `source_tag`. Returns the number removed.
    pub async fn delete_by_source_tag(pool: &PgPool, source_tag: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM form_responses WHERE source_tag = $1")
            .bind(source_tag)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_for_form(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM form_responses WHERE form_id = $1")
            .bind(form_id)
            .fetch_one(executor)
            .await
    }

    /// Whether this submitter already responded. Generic responses have no
    /// email column, so email keys are matched against email-type entries.
    pub async fn submitter_exists(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
        key: &SubmitterKey,
    ) -> Result<bool, sqlx::Error> {
        match key {
            SubmitterKey::Email(email) => {
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM form_responses r, \
                         jsonb_array_elements(r.responses) AS entry \
                     WHERE r.form_id = $1 AND entry->>'fieldType' = 'email' \
                       AND lower(entry->>'value') = $2)",
                )
                .bind(form_id)
                .bind(email)
                .fetch_one(executor)
                .await
            }
            SubmitterKey::IpAddress(ip) => {
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM form_responses \
                     WHERE form_id = $1 AND ip_address = $2)",
                )
                .bind(form_id)
                .bind(ip)
                .fetch_one(executor)
                .await
            }
        }
    }
}
