//! Handlers for the `/imports` resource (bulk import upload and polling).

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use formflow_core::error::CoreError;
use formflow_core::import::{ImportMode, DEFAULT_SOURCE_TAG};
use formflow_core::records::TargetCollection;
use formflow_core::types::DbId;
use formflow_db::models::import_job::{CreateImportJob, ImportJob};
use formflow_db::repositories::ImportJobRepo;
use formflow_pipeline::{ImportJobSpec, UploadStore};
use serde::{Deserialize, Serialize};

use crate::background::import_jobs;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Fields collected from the multipart upload.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    target_collection: Option<TargetCollection>,
    import_mode: ImportMode,
    source_tag: Option<String>,
    enable_ai_mapping: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptedImport {
    pub job_id: DbId,
    pub status: String,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

async fn read_upload(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut upload = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| AppError::BadRequest("Uploaded file has no name".into()))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload.file = Some((file_name, data.to_vec()));
            }
            "target_collection" => {
                let text = field_text(field).await?;
                let target = TargetCollection::from_str(&text).ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "Unknown target collection '{text}'. Must be one of: {}",
                        TargetCollection::ALL.join(", ")
                    )))
                })?;
                upload.target_collection = Some(target);
            }
            "import_mode" => {
                let text = field_text(field).await?;
                upload.import_mode = ImportMode::from_str(&text).ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "Unknown import mode '{text}'. Must be 'append' or 'replace'"
                    )))
                })?;
            }
            "source_tag" => {
                let text = field_text(field).await?;
                upload.source_tag = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            "enable_ai_mapping" => {
                upload.enable_ai_mapping = parse_flag(&field_text(field).await?);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown upload field");
            }
        }
    }

    Ok(upload)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// POST /api/v1/imports
///
/// Stage the uploaded file, create a job in `processing` and start it in
/// the background. Returns 202 with the job id; progress is polled.
pub async fn create_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<AcceptedImport>>)> {
    let upload = read_upload(multipart).await?;

    let (file_name, data) = upload
        .file
        .ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;
    let target = upload
        .target_collection
        .ok_or_else(|| AppError::BadRequest("Missing 'target_collection' field".into()))?;
    let source_tag = upload
        .source_tag
        .unwrap_or_else(|| DEFAULT_SOURCE_TAG.to_string());

    let source_ref = state
        .uploads
        .stage(&file_name, &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;

    let created = ImportJobRepo::create(
        &state.pool,
        &CreateImportJob {
            file_name: file_name.clone(),
            source_file_ref: source_ref.clone(),
            target_collection: target,
            import_mode: upload.import_mode,
            source_tag: source_tag.clone(),
            enable_ai_mapping: upload.enable_ai_mapping,
            runner_instance: state.config.instance_id.clone(),
        },
    )
    .await;

    // No job owns the staged file yet, so nothing else will remove it.
    let job = match created {
        Ok(job) => job,
        Err(e) => {
            match state.uploads.delete(&source_ref).await {
                Ok(()) => tracing::debug!(source_ref = %source_ref, "Removed orphaned upload"),
                Err(cleanup) => tracing::warn!(
                    source_ref = %source_ref,
                    error = %cleanup,
                    "Failed to remove orphaned upload",
                ),
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        job_id = job.id,
        file = %file_name,
        bytes = data.len(),
        target = %target,
        "Bulk import accepted",
    );

    import_jobs::spawn(
        &state,
        ImportJobSpec {
            job_id: job.id,
            file_name,
            source_ref,
            target,
            mode: upload.import_mode,
            source_tag,
            enable_ai_mapping: upload.enable_ai_mapping,
        },
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: AcceptedImport {
                job_id: job.id,
                status: job.status,
            },
        }),
    ))
}

/// GET /api/v1/imports/{id}
pub async fn get_import(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ImportJob>>> {
    let job = ImportJobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportJob",
            id,
        }))?;
    Ok(Json(DataResponse { data: job }))
}

#[derive(Debug, Deserialize)]
pub struct ListImportsParams {
    pub limit: Option<i64>,
}

/// GET /api/v1/imports
pub async fn list_imports(
    State(state): State<AppState>,
    Query(params): Query<ListImportsParams>,
) -> AppResult<Json<DataResponse<Vec<ImportJob>>>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let jobs = ImportJobRepo::list_recent(&state.pool, limit).await?;
    Ok(Json(DataResponse { data: jobs }))
}
