//! Detached bulk import runs.
//!
//! The upload handler creates the job row and stages the file, then hands
//! the job to [`spawn`]. The run outlives the request; clients poll the job
//! row for progress.

use formflow_pipeline::assistant::AiMappingAssistant;
use formflow_pipeline::store::{PgJobStore, PgRecordSink};
use formflow_pipeline::{run_import_job, ImportJobSpec, ImportPorts, RowEnhancer};

use crate::state::AppState;

/// Message recorded on jobs found still `processing` at startup.
pub const ABANDONED_JOB_MESSAGE: &str = "Import interrupted by a server restart";

/// Run `spec` in the background on the state's task tracker.
pub fn spawn(state: &AppState, spec: ImportJobSpec) {
    let tracker = state.import_tasks.clone();
    let state = state.clone();
    tracker.spawn(async move {
        run(state, spec).await;
    });
}

async fn run(state: AppState, spec: ImportJobSpec) {
    let records = PgRecordSink::new(state.pool.clone());
    let jobs = PgJobStore::new(state.pool.clone());

    // One assistant per job: it holds that job's mapping.
    let assistant = state
        .config
        .ai
        .clone()
        .map(|config| AiMappingAssistant::with_client(state.http.clone(), config));
    if spec.enable_ai_mapping && assistant.is_none() {
        tracing::info!(
            job_id = spec.job_id,
            "AI mapping requested but no AI credential is configured",
        );
    }

    let ports = ImportPorts {
        records: &records,
        jobs: &jobs,
        uploads: &*state.uploads,
        enhancer: assistant.as_ref().map(|a| a as &dyn RowEnhancer),
    };

    let outcome = run_import_job(&ports, &state.config.import_settings(), &spec).await;
    tracing::debug!(job_id = spec.job_id, status = %outcome.status, "Import task exiting");
}

/// Fail jobs this instance's previous process left in `processing`. Their
/// runner is gone, so nothing else would ever finalize them.
pub async fn fail_abandoned(pool: &formflow_db::DbPool, instance_id: &str) {
    match formflow_db::repositories::ImportJobRepo::fail_abandoned(
        pool,
        instance_id,
        ABANDONED_JOB_MESSAGE,
    )
    .await
    {
        Ok(0) => {}
        Ok(count) => tracing::warn!(
            count,
            instance_id,
            "Marked abandoned import jobs as failed",
        ),
        Err(e) => tracing::error!(error = %e, "Failed to clean up abandoned import jobs"),
    }
}
