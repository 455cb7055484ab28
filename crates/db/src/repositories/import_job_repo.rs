//! Repository for the `bulk_import_jobs` table.

use formflow_core::import::ImportJobStatus;
use formflow_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::import_job::{CreateImportJob, ImportJob, JobCounters};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, file_name, source_file_ref, target_collection, import_mode, \
    source_tag, enable_ai_mapping, runner_instance, status, total_records, processed_records, \
    successful_records, failed_records, errors, completed_at, created_at, updated_at";

/// Provides persistence for bulk import jobs.
pub struct ImportJobRepo;

impl ImportJobRepo {
    /// Insert a new job in `processing` state.
    pub async fn create(pool: &PgPool, body: &CreateImportJob) -> Result<ImportJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO bulk_import_jobs \
                (file_name, source_file_ref, target_collection, import_mode, source_tag, \
                 enable_ai_mapping, runner_instance, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(&body.file_name)
            .bind(&body.source_file_ref)
            .bind(body.target_collection.as_str())
            .bind(body.import_mode.as_str())
            .bind(&body.source_tag)
            .bind(body.enable_ai_mapping)
            .bind(&body.runner_instance)
            .bind(ImportJobStatus::Processing.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_import_jobs WHERE id = $1");
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bulk_import_jobs ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Write a progress checkpoint while the job is still processing.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        counters: &JobCounters,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bulk_import_jobs \
             SET total_records = $2, processed_records = $3, successful_records = $4, \
                 failed_records = $5, errors = $6, updated_at = now() \
             WHERE id = $1 AND status = $7",
        )
        .bind(id)
        .bind(counters.total_records)
        .bind(counters.processed_records)
        .bind(counters.successful_records)
        .bind(counters.failed_records)
        .bind(Json(&counters.errors))
        .bind(ImportJobStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Set the terminal status with the final counters. Only a job still in
    /// `processing` is updated, so the terminal status is written once.
    /// Returns `false` if the job was already finalized.
    pub async fn finalize(
        pool: &PgPool,
        id: DbId,
        status: ImportJobStatus,
        counters: &JobCounters,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bulk_import_jobs \
             SET status = $2, total_records = $3, processed_records = $4, \
                 successful_records = $5, failed_records = $6, errors = $7, \
                 completed_at = now(), updated_at = now() \
             WHERE id = $1 AND status = $8",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(counters.total_records)
        .bind(counters.processed_records)
        .bind(counters.successful_records)
        .bind(counters.failed_records)
        .bind(Json(&counters.errors))
        .bind(ImportJobStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail jobs that `runner_instance` left in `processing` before it
    /// restarted. Jobs run by other instances are not touched. Returns the
    /// number of jobs marked failed.
    pub async fn fail_abandoned(
        pool: &PgPool,
        runner_instance: &str,
        message: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bulk_import_jobs \
             SET status = $1, errors = errors || jsonb_build_array($2::TEXT), \
                 completed_at = now(), updated_at = now() \
             WHERE status = $3 AND runner_instance = $4",
        )
        .bind(ImportJobStatus::Failed.as_str())
        .bind(message)
        .bind(ImportJobStatus::Processing.as_str())
        .bind(runner_instance)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
