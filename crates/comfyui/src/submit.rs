//! Job submission: record the job, forward the workflow, map the
//! backend's prompt id back onto the job row.

use relay_db::models::{DeliveryMode, Job, NewJob, OutputFormat};
use relay_db::store::{JobStore, StoreError};

use crate::api::{ComfyApiError, ComfyService};
use crate::workflow::randomize_seeds;

/// A generation job as accepted from the caller.
#[derive(Debug, serde::Deserialize)]
pub struct SubmitRequest {
    /// Caller-side correlation id, echoed back verbatim.
    pub external_execution_id: String,
    pub delivery_mode: DeliveryMode,
    /// Webhook URL; required when `delivery_mode` is `webhook`.
    #[serde(default)]
    pub delivery_target: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
    /// The workflow graph, forwarded to the backend as-is apart from
    /// seed randomization.
    pub workflow: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Backend rejected workflow: {0}")]
    Backend(#[from] ComfyApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submit a generation job.
///
/// The job row is created *before* the backend call so that a crash
/// between the two leaves a `pending_submission` row rather than an
/// untracked backend run. On backend failure the row is marked
/// `submission_failed` and the error propagated to the caller.
pub async fn submit_job(
    store: &dyn JobStore,
    comfy: &dyn ComfyService,
    mut request: SubmitRequest,
) -> Result<Job, SubmitError> {
    let job = store
        .create(NewJob {
            job_id: uuid::Uuid::new_v4(),
            external_execution_id: request.external_execution_id,
            delivery_mode: request.delivery_mode,
            delivery_target: request.delivery_target,
            output_format: request.output_format,
        })
        .await?;

    let touched = randomize_seeds(&mut request.workflow);
    tracing::debug!(job_id = %job.job_id, sampler_nodes = touched, "Randomized workflow seeds");

    let client_id = uuid::Uuid::new_v4().to_string();
    match comfy.submit_prompt(&request.workflow, &client_id).await {
        Ok(response) => {
            tracing::info!(
                job_id = %job.job_id,
                prompt_id = %response.prompt_id,
                "Workflow queued on backend",
            );
            store.mark_queued(job.job_id, &response.prompt_id).await?;
            Ok(store.get_by_id(job.job_id).await?.unwrap_or(job))
        }
        Err(e) => {
            tracing::error!(job_id = %job.job_id, error = %e, "Workflow submission failed");
            if let Err(store_err) = store.mark_submission_failed(job.job_id).await {
                tracing::error!(
                    job_id = %job.job_id,
                    error = %store_err,
                    "Failed to record submission failure",
                );
            }
            Err(SubmitError::Backend(e))
        }
    }
}
