use std::sync::Arc;

use formflow_pipeline::store::FsUploadStore;
use tokio_util::task::TaskTracker;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: formflow_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Staging area for import uploads.
    pub uploads: Arc<FsUploadStore>,
    /// Detached import jobs; shutdown waits on it.
    pub import_tasks: TaskTracker,
    /// Shared HTTP client for the AI mapping assistant.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: formflow_db::DbPool, config: ServerConfig) -> Self {
        let uploads = Arc::new(FsUploadStore::new(config.upload_dir.clone()));
        Self {
            pool,
            config: Arc::new(config),
            uploads,
            import_tasks: TaskTracker::new(),
            http: reqwest::Client::new(),
        }
    }
}
