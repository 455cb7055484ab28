use std::path::PathBuf;
use std::time::Duration;

use formflow_pipeline::assistant::{AiMappingConfig, DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL};
use formflow_pipeline::ImportSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Stable name of this server instance (default: `default`). Jobs are
    /// tagged with it so a restart only fails its own unfinished imports.
    pub instance_id: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running import jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory holding staged import uploads.
    pub upload_dir: PathBuf,
    /// Largest accepted import upload in bytes (default: 20 MiB).
    pub max_upload_bytes: usize,
    /// AI column mapping; `None` when `AI_API_KEY` is unset.
    pub ai: Option<AiMappingConfig>,
    /// Upper bound on each AI call in seconds (default: `10`).
    pub ai_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                     |
    /// |-------------------------|-----------------------------|
    /// | `HOST`                  | `0.0.0.0`                   |
    /// | `PORT`                  | `3000`                      |
    /// | `INSTANCE_ID`           | `default`                   |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                        |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                        |
    /// | `UPLOAD_DIR`            | `/tmp/formflow/uploads`     |
    /// | `MAX_UPLOAD_BYTES`      | `20971520`                  |
    /// | `AI_API_KEY`            | unset (AI mapping disabled) |
    /// | `AI_BASE_URL`           | `https://api.openai.com/v1` |
    /// | `AI_MODEL`              | `gpt-4o-mini`               |
    /// | `AI_TIMEOUT_SECS`       | `10`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let instance_id = std::env::var("INSTANCE_ID")
            .ok()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "default".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let upload_dir = PathBuf::from(
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "/tmp/formflow/uploads".into()),
        );

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (20 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let ai = std::env::var("AI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| AiMappingConfig {
                api_key,
                base_url: std::env::var("AI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_AI_BASE_URL.into()),
                model: std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.into()),
            });

        let ai_timeout_secs: u64 = std::env::var("AI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("AI_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            instance_id,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            upload_dir,
            max_upload_bytes,
            ai,
            ai_timeout_secs,
        }
    }

    /// Runner tunables derived from this configuration.
    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            ai_timeout: Duration::from_secs(self.ai_timeout_secs),
            ..Default::default()
        }
    }
}
