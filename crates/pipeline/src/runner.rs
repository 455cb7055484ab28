//! The bulk import job runner.
//!
//! One call processes one job from start to terminal status. Records are
//! handled strictly in file order; a failing record is counted and logged
//! and the loop moves on.

use std::time::Duration;

use formflow_core::import::{
    parse_rows, row_to_record, ImportFormat, ImportJobStatus, ImportMode, JobProgress, ParsedRow,
    Row,
};
use formflow_core::records::TargetCollection;
use formflow_core::types::DbId;
use serde::Serialize;

use crate::capabilities::{JobStore, RecordSink, RowEnhancer, UploadStore};
use crate::error::{EnhanceError, PipelineError};
use crate::settings::ImportSettings;

/// Everything the runner needs to know about a job.
#[derive(Debug, Clone)]
pub struct ImportJobSpec {
    pub job_id: DbId,
    /// Original upload name; its extension selects the parser.
    pub file_name: String,
    /// Where the staged upload lives in the [`UploadStore`].
    pub source_ref: String,
    pub target: TargetCollection,
    pub mode: ImportMode,
    pub source_tag: String,
    pub enable_ai_mapping: bool,
}

/// The collaborators a run talks to.
pub struct ImportPorts<'a> {
    pub records: &'a dyn RecordSink,
    pub jobs: &'a dyn JobStore,
    pub uploads: &'a dyn UploadStore,
    /// `None` when no AI credential is configured.
    pub enhancer: Option<&'a dyn RowEnhancer>,
}

/// Final state of a run, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub status: ImportJobStatus,
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ImportOutcome {
    fn from_progress(status: ImportJobStatus, progress: &JobProgress) -> Self {
        Self {
            status,
            total: progress.total,
            processed: progress.processed,
            successful: progress.successful,
            failed: progress.failed,
            errors: progress.errors.to_vec(),
        }
    }
}

/// Run a job to completion and persist its terminal status.
pub async fn run_import_job(
    ports: &ImportPorts<'_>,
    settings: &ImportSettings,
    spec: &ImportJobSpec,
) -> ImportOutcome {
    tracing::info!(
        job_id = spec.job_id,
        file = %spec.file_name,
        target = %spec.target,
        mode = spec.mode.as_str(),
        source_tag = %spec.source_tag,
        "Starting bulk import",
    );

    let rows = match load_rows(ports, spec).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(job_id = spec.job_id, error = %e, "Bulk import could not start");
            let mut progress = JobProgress::new(0, settings.max_error_log);
            progress.note(e.to_string());
            return finish(ports, spec, ImportJobStatus::Failed, &progress).await;
        }
    };

    let mut progress = JobProgress::new(rows.len(), settings.max_error_log);
    checkpoint(ports, spec.job_id, &progress).await;

    if spec.mode == ImportMode::Replace {
        match ports
            .records
            .delete_by_source_tag(spec.target, &spec.source_tag)
            .await
        {
            Ok(removed) => tracing::info!(
                job_id = spec.job_id,
                removed,
                "Cleared records for replace import",
            ),
            Err(e) => {
                tracing::warn!(job_id = spec.job_id, error = %e, "Replace pre-clear failed");
                progress.note(format!("Could not clear existing records: {e}"));
            }
        }
    }

    let enhancer = match ports.enhancer {
        Some(enhancer) if spec.enable_ai_mapping => {
            prime_enhancer(enhancer, &rows, spec, settings).await
        }
        _ => None,
    };

    for (index, parsed) in rows.iter().enumerate() {
        let result = match parsed {
            Ok(raw) => import_row(ports, enhancer, raw, spec, index, settings).await,
            Err(message) => Err(message.clone()),
        };
        match result {
            Ok(()) => progress.record_success(),
            Err(message) => {
                tracing::warn!(
                    job_id = spec.job_id,
                    record = index + 1,
                    error = %message,
                    "Record failed",
                );
                progress.record_failure(index, &message);
            }
        }

        if progress.is_checkpoint(settings.checkpoint_interval) {
            checkpoint(ports, spec.job_id, &progress).await;
        }
    }

    let status = progress.terminal_status();
    finish(ports, spec, status, &progress).await
}

async fn load_rows(
    ports: &ImportPorts<'_>,
    spec: &ImportJobSpec,
) -> Result<Vec<ParsedRow>, PipelineError> {
    let format = ImportFormat::from_file_name(&spec.file_name)?;
    let bytes = ports.uploads.read(&spec.source_ref).await?;
    Ok(parse_rows(format, &bytes)?)
}

/// Enhance, route and store one readable row.
async fn import_row(
    ports: &ImportPorts<'_>,
    enhancer: Option<&dyn RowEnhancer>,
    raw: &Row,
    spec: &ImportJobSpec,
    index: usize,
    settings: &ImportSettings,
) -> Result<(), String> {
    let row = match enhancer {
        Some(enhancer) => enhance_or_raw(enhancer, raw, spec, index, settings.ai_timeout).await,
        None => raw.clone(),
    };

    let outcome = row_to_record(&row, spec.target, &spec.source_tag, chrono::Utc::now());
    ports
        .records
        .insert(&outcome.record)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Ask the enhancer for a mapping. Returns it only if priming succeeded in
/// time; otherwise the job runs without AI.
async fn prime_enhancer<'a>(
    enhancer: &'a dyn RowEnhancer,
    rows: &[ParsedRow],
    spec: &ImportJobSpec,
    settings: &ImportSettings,
) -> Option<&'a dyn RowEnhancer> {
    let sample: Vec<Row> = rows
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .take(settings.ai_sample_size)
        .cloned()
        .collect();
    match with_timeout(settings.ai_timeout, enhancer.prime(&sample, spec.target)).await {
        Ok(()) => Some(enhancer),
        Err(e) => {
            tracing::warn!(job_id = spec.job_id, error = %e, "AI mapping unavailable, importing raw rows");
            None
        }
    }
}

async fn enhance_or_raw(
    enhancer: &dyn RowEnhancer,
    row: &Row,
    spec: &ImportJobSpec,
    index: usize,
    timeout: Duration,
) -> Row {
    match with_timeout(timeout, enhancer.enhance_row(row, spec.target)).await {
        Ok(enhanced) => enhanced,
        Err(e) => {
            tracing::debug!(job_id = spec.job_id, record = index + 1, error = %e, "Using raw row");
            row.clone()
        }
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, EnhanceError>>,
) -> Result<T, EnhanceError> {
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(EnhanceError::Timeout))
}

async fn checkpoint(ports: &ImportPorts<'_>, job_id: DbId, progress: &JobProgress) {
    tracing::debug!(
        job_id,
        processed = progress.processed,
        total = progress.total,
        "Import checkpoint",
    );
    if let Err(e) = ports.jobs.checkpoint(job_id, progress).await {
        tracing::warn!(job_id, error = %e, "Failed to persist import progress");
    }
}

async fn finish(
    ports: &ImportPorts<'_>,
    spec: &ImportJobSpec,
    status: ImportJobStatus,
    progress: &JobProgress,
) -> ImportOutcome {
    if let Err(e) = ports.jobs.finalize(spec.job_id, status, progress).await {
        tracing::error!(job_id = spec.job_id, error = %e, "Failed to finalize import job");
    }

    if let Err(e) = ports.uploads.delete(&spec.source_ref).await {
        tracing::warn!(job_id = spec.job_id, error = %e, "Failed to delete staged upload");
    }

    tracing::info!(
        job_id = spec.job_id,
        status = %status,
        total = progress.total,
        successful = progress.successful,
        failed = progress.failed,
        "Bulk import finished",
    );

    ImportOutcome::from_progress(status, progress)
}
