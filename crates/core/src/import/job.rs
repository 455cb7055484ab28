//! Bulk import job state: modes, statuses, counters and the bounded error
//! log, plus the checkpoint cadence and terminal status rules.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Errors kept on a job; older entries are dropped first.
pub const MAX_ERROR_LOG: usize = 50;

/// Progress is persisted at least this often (in records).
pub const CHECKPOINT_INTERVAL: usize = 10;

// ---------------------------------------------------------------------------
// Mode / status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    #[default]
    Append,
    /// Delete the collection's records carrying the job's source tag first.
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Replace => "replace",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "append" => Some(Self::Append),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportJobStatus {
    #[default]
    Processing,
    Completed,
    Partial,
    Failed,
}

impl ImportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &["processing", "completed", "partial", "failed"];
}

impl std::fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Error log that keeps only the most recent `cap` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLog {
    entries: VecDeque<String>,
    cap: usize,
}

impl ErrorLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(MAX_ERROR_LOG)),
            cap,
        }
    }

    pub fn push(&mut self, entry: String) {
        if self.cap == 0 {
            return;
        }
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(MAX_ERROR_LOG)
    }
}

/// Counters for one job run. Only the runner mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: ErrorLog,
}

impl JobProgress {
    pub fn new(total: usize, error_cap: usize) -> Self {
        Self {
            total,
            processed: 0,
            successful: 0,
            failed: 0,
            errors: ErrorLog::new(error_cap),
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.successful += 1;
    }

    /// Count a failed record. `index` is zero-based; the log uses the
    /// one-based record number.
    pub fn record_failure(&mut self, index: usize, message: &str) {
        self.processed += 1;
        self.failed += 1;
        self.errors.push(record_error(index, message));
    }

    /// Log a job-level problem without touching the counters.
    pub fn note(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Whether progress should be persisted after the latest record.
    pub fn is_checkpoint(&self, interval: usize) -> bool {
        let interval = interval.max(1);
        self.processed == self.total || self.processed % interval == 0
    }

    pub fn counters_consistent(&self) -> bool {
        self.successful + self.failed == self.processed && self.processed <= self.total
    }

    /// Terminal status once every record has been attempted.
    pub fn terminal_status(&self) -> ImportJobStatus {
        match (self.successful, self.failed) {
            (0, _) => ImportJobStatus::Failed,
            (_, 0) => ImportJobStatus::Completed,
            _ => ImportJobStatus::Partial,
        }
    }
}

/// Error log line for a record.
pub fn record_error(index: usize, message: &str) -> String {
    format!("Record {}: {message}", index + 1)
}
