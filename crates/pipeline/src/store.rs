//! Production implementations of the runner's capability traits:
//! PostgreSQL for records and job state, the local filesystem for staged
//! uploads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use formflow_core::import::{ImportJobStatus, JobProgress};
use formflow_core::records::{RoutedRecord, TargetCollection};
use formflow_core::types::DbId;
use formflow_db::models::import_job::JobCounters;
use formflow_db::repositories::{ImportJobRepo, RecordRepo};
use sqlx::PgPool;

use crate::capabilities::{JobStore, RecordSink, UploadStore};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Writes routed records through [`RecordRepo`].
#[derive(Clone)]
pub struct PgRecordSink {
    pool: PgPool,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for PgRecordSink {
    async fn insert(&self, record: &RoutedRecord) -> Result<DbId, PipelineError> {
        Ok(RecordRepo::insert(&self.pool, record).await?)
    }

    async fn delete_by_source_tag(
        &self,
        target: TargetCollection,
        source_tag: &str,
    ) -> Result<u64, PipelineError> {
        Ok(RecordRepo::delete_by_source_tag(&self.pool, target, source_tag).await?)
    }
}

/// Persists job progress through [`ImportJobRepo`].
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn checkpoint(&self, job_id: DbId, progress: &JobProgress) -> Result<(), PipelineError> {
        let counters = JobCounters::from_progress(progress);
        Ok(ImportJobRepo::update_progress(&self.pool, job_id, &counters).await?)
    }

    async fn finalize(
        &self,
        job_id: DbId,
        status: ImportJobStatus,
        progress: &JobProgress,
    ) -> Result<(), PipelineError> {
        let counters = JobCounters::from_progress(progress);
        let updated = ImportJobRepo::finalize(&self.pool, job_id, status, &counters).await?;
        if !updated {
            tracing::warn!(job_id, status = %status, "Import job was already finalized");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Staged uploads as flat files under one directory. References are bare
/// file names; anything resolving outside the root is rejected.
#[derive(Debug, Clone)]
pub struct FsUploadStore {
    root: PathBuf,
}

impl FsUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an accepted upload and return its reference. The original
    /// extension is kept so the runner can pick the parser.
    pub async fn stage(&self, file_name: &str, bytes: &[u8]) -> Result<String, PipelineError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let reference = match extension {
            Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4()),
            None => uuid::Uuid::new_v4().to_string(),
        };

        tokio::fs::write(self.root.join(&reference), bytes).await?;
        Ok(reference)
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, PipelineError> {
        let valid = !reference.is_empty()
            && reference != "."
            && reference != ".."
            && !reference.contains(['/', '\\']);
        if !valid {
            return Err(PipelineError::Store(format!(
                "Invalid upload reference: {reference}"
            )));
        }
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl UploadStore for FsUploadStore {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, PipelineError> {
        let path = self.resolve(reference)?;
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, reference: &str) -> Result<(), PipelineError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn stage_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsUploadStore::new(dir.path().join("uploads"));

        let reference = store.stage("Contacts.CSV", b"name\nAsha\n").await.unwrap();
        assert!(reference.ends_with(".csv"));
        assert_eq!(store.read(&reference).await.unwrap(), b"name\nAsha\n");

        store.delete(&reference).await.unwrap();
        assert_matches!(store.read(&reference).await, Err(PipelineError::Io(_)));
        // Deleting twice is fine.
        store.delete(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_references_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsUploadStore::new(dir.path());

        for reference in ["../etc/passwd", "a/b.csv", "..", ""] {
            assert_matches!(store.read(reference).await, Err(PipelineError::Store(_)));
        }
    }
}
