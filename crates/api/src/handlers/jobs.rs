//! Handlers for the `/jobs` resource: submission and status snapshots.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use relay_comfyui::submit::{submit_job as forward_job, SubmitRequest};
use relay_core::types::JobId;
use relay_db::models::DeliveryMode;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject requests whose delivery configuration cannot be fulfilled.
fn validate_request(input: &SubmitRequest) -> AppResult<()> {
    if input.external_execution_id.trim().is_empty() {
        return Err(AppError::Validation(
            "external_execution_id must not be empty".into(),
        ));
    }

    if input.delivery_mode == DeliveryMode::Webhook {
        match input.delivery_target.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(_) => {
                return Err(AppError::Validation(
                    "delivery_target must be an http(s) URL".into(),
                ));
            }
            None => {
                return Err(AppError::Validation(
                    "delivery_target is required for webhook delivery".into(),
                ));
            }
        }
    }

    if !input.workflow.is_object() {
        return Err(AppError::Validation(
            "workflow must be a JSON object".into(),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Submit a generation job: the workflow is forwarded to the backend and
/// the job record returned in `queued` status. A backend rejection is
/// surfaced as 502 with the job left in `submission_failed`.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitRequest>,
) -> AppResult<impl IntoResponse> {
    validate_request(&input)?;

    let job = forward_job(state.store.as_ref(), state.comfy.as_ref(), input).await?;

    tracing::info!(
        job_id = %job.job_id,
        external_execution_id = %job.external_execution_id,
        delivery_mode = %job.delivery_mode,
        "Job submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
///
/// Status snapshot for a single job, including the result manifest once
/// the job has completed.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .get_by_id(job_id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        })?;

    Ok(Json(DataResponse { data: job }))
}
