//! Capability interfaces the import runner depends on.

use async_trait::async_trait;
use formflow_core::import::{ImportJobStatus, JobProgress, Row};
use formflow_core::records::{RoutedRecord, TargetCollection};
use formflow_core::types::DbId;

use crate::error::{EnhanceError, PipelineError};

/// Persists routed records into their collections.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, record: &RoutedRecord) -> Result<DbId, PipelineError>;

    /// Remove every record in `target` carrying `source_tag`.
    async fn delete_by_source_tag(
        &self,
        target: TargetCollection,
        source_tag: &str,
    ) -> Result<u64, PipelineError>;
}

/// Persists job progress. Only the job's runner calls it.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn checkpoint(&self, job_id: DbId, progress: &JobProgress) -> Result<(), PipelineError>;

    async fn finalize(
        &self,
        job_id: DbId,
        status: ImportJobStatus,
        progress: &JobProgress,
    ) -> Result<(), PipelineError>;
}

/// Access to staged upload files.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, PipelineError>;

    async fn delete(&self, reference: &str) -> Result<(), PipelineError>;
}

/// Best-effort row enrichment (AI column mapping).
#[async_trait]
pub trait RowEnhancer: Send + Sync {
    /// Called once per job with the first few rows before any row is
    /// enhanced.
    async fn prime(&self, _sample: &[Row], _target: TargetCollection) -> Result<(), EnhanceError> {
        Ok(())
    }

    async fn enhance_row(&self, row: &Row, target: TargetCollection) -> Result<Row, EnhanceError>;
}
