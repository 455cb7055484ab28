use formflow_core::import::ImportError;

/// Errors from the pipeline's storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Storage error: {0}")]
    Store(String),
}

/// Errors from the AI mapping assistant. Always recovered by falling back
/// to the raw row.
#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    #[error("AI assistant timed out")]
    Timeout,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The assistant returned a non-2xx status code.
    #[error("AI assistant error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("No column mapping available for this job")]
    NotPrimed,
}
