//! Bulk import job rows and DTOs.

use formflow_core::import::{ImportJobStatus, ImportMode};
use formflow_core::records::TargetCollection;
use formflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `bulk_import_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportJob {
    pub id: DbId,
    pub file_name: String,
    pub source_file_ref: String,
    pub target_collection: String,
    pub import_mode: String,
    pub source_tag: String,
    pub enable_ai_mapping: bool,
    /// Server instance whose task runs the job.
    pub runner_instance: String,
    pub status: String,
    pub total_records: i32,
    pub processed_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    pub errors: serde_json::Value,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportJob {
    pub fn job_status(&self) -> Option<ImportJobStatus> {
        ImportJobStatus::from_str(&self.status)
    }

    pub fn target(&self) -> Option<TargetCollection> {
        TargetCollection::from_str(&self.target_collection)
    }

    pub fn mode(&self) -> Option<ImportMode> {
        ImportMode::from_str(&self.import_mode)
    }
}

/// DTO for creating a job when an upload is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportJob {
    pub file_name: String,
    pub source_file_ref: String,
    pub target_collection: TargetCollection,
    pub import_mode: ImportMode,
    pub source_tag: String,
    pub enable_ai_mapping: bool,
    pub runner_instance: String,
}

/// Counter snapshot written at checkpoints and on finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobCounters {
    pub total_records: i32,
    pub processed_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    pub errors: Vec<String>,
}

impl JobCounters {
    pub fn from_progress(progress: &formflow_core::import::JobProgress) -> Self {
        let clamp = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        Self {
            total_records: clamp(progress.total),
            processed_records: clamp(progress.processed),
            successful_records: clamp(progress.successful),
            failed_records: clamp(progress.failed),
            errors: progress.errors.to_vec(),
        }
    }
}
