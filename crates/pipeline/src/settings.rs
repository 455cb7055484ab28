use std::time::Duration;

use formflow_core::import::job::{CHECKPOINT_INTERVAL, MAX_ERROR_LOG};

/// Rows sent to the AI assistant when asking for a column mapping.
pub const DEFAULT_AI_SAMPLE_SIZE: usize = 5;

/// Upper bound on any single AI assistant call.
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for a bulk import run.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Persist progress after at least this many records.
    pub checkpoint_interval: usize,
    /// Error lines kept on the job (most recent).
    pub max_error_log: usize,
    pub ai_sample_size: usize,
    pub ai_timeout: Duration,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: CHECKPOINT_INTERVAL,
            max_error_log: MAX_ERROR_LOG,
            ai_sample_size: DEFAULT_AI_SAMPLE_SIZE,
            ai_timeout: DEFAULT_AI_TIMEOUT,
        }
    }
}
