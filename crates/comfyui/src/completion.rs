//! Completion handling for one finished backend run.
//!
//! Invoked by the event listener (possibly more than once per run —
//! duplicate and out-of-order events are expected). The store's
//! no-op-on-completed guarantee makes the transition and the delivery
//! attempt happen at most once.

use std::path::PathBuf;
use std::sync::Arc;

use relay_core::channels::ChannelRegistry;
use relay_db::models::{DeliveryMode, Job, JobStatus};
use relay_db::store::{JobStore, StoreError};

use crate::api::{ComfyApiError, ComfyService};
use crate::delivery::WebhookSender;
use crate::output::format_output;

/// What a single handler invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The job was transitioned to `completed` and delivery attempted.
    Completed,
    /// Another invocation already completed this run; nothing done.
    AlreadyCompleted,
    /// No job maps to this prompt id; nothing done.
    UnknownRun,
    /// The backend has no history for this run. Recoverable: a later
    /// duplicate event may retry, but nothing is scheduled here.
    NoHistory,
}

/// Errors surfaced by a handler invocation. All of them abort the
/// invocation only; the listener logs and keeps reading the stream.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("History fetch failed: {0}")]
    Backend(#[from] ComfyApiError),

    #[error("Failed to encode result payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Orchestrates store lookup, result retrieval, formatting and dispatch
/// for one completed backend run.
pub struct CompletionHandler {
    store: Arc<dyn JobStore>,
    comfy: Arc<dyn ComfyService>,
    channels: Arc<ChannelRegistry>,
    webhook: WebhookSender,
    /// Backend output directory used for `file_reference` payloads.
    output_dir: PathBuf,
}

impl CompletionHandler {
    pub fn new(
        store: Arc<dyn JobStore>,
        comfy: Arc<dyn ComfyService>,
        channels: Arc<ChannelRegistry>,
        webhook: WebhookSender,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            comfy,
            channels,
            webhook,
            output_dir,
        }
    }

    /// Handle a completed run.
    ///
    /// `manifest` is the embedded output when the backend reported it
    /// directly; when `None`, the manifest is retrieved from the
    /// history endpoint.
    pub async fn handle(
        &self,
        prompt_id: &str,
        manifest: Option<serde_json::Value>,
    ) -> Result<CompletionOutcome, CompletionError> {
        let Some(job) = self.store.get_by_prompt_id(prompt_id).await? else {
            tracing::debug!(prompt_id, "No job mapped to prompt, skipping");
            return Ok(CompletionOutcome::UnknownRun);
        };
        if job.status == JobStatus::Completed {
            tracing::debug!(prompt_id, job_id = %job.job_id, "Job already completed, skipping");
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let manifest = match manifest {
            Some(manifest) => manifest,
            None => {
                let history = self.comfy.get_history(prompt_id).await?;
                match extract_outputs(&history, prompt_id) {
                    Some(manifest) => manifest,
                    None => {
                        tracing::warn!(
                            prompt_id,
                            job_id = %job.job_id,
                            "No history for prompt, aborting completion",
                        );
                        return Ok(CompletionOutcome::NoHistory);
                    }
                }
            }
        };

        // The conditional update is the idempotence point: a racing
        // duplicate observes no change applied and stops here.
        let Some(job) = self.store.complete(prompt_id, &manifest).await? else {
            tracing::debug!(prompt_id, "Completion already applied by a concurrent invocation");
            return Ok(CompletionOutcome::AlreadyCompleted);
        };

        tracing::info!(job_id = %job.job_id, prompt_id, "Job completed");

        let payload =
            format_output(self.comfy.as_ref(), job.output_format, &manifest, &self.output_dir)
                .await;
        let payload = serde_json::to_value(&payload)?;

        self.dispatch(&job, payload).await;
        Ok(CompletionOutcome::Completed)
    }

    /// Deliver the formatted payload. Best effort: failures are logged
    /// and the job stays `completed` in the store either way.
    async fn dispatch(&self, job: &Job, payload: serde_json::Value) {
        match job.delivery_mode {
            DeliveryMode::Push => {
                if self.channels.send_result(job.job_id, payload).await {
                    tracing::info!(job_id = %job.job_id, "Result pushed over live channel");
                } else {
                    tracing::info!(
                        job_id = %job.job_id,
                        "No live push channel, dropping result (caller can poll status)",
                    );
                }
            }
            DeliveryMode::Webhook => {
                let Some(url) = job.delivery_target.as_deref() else {
                    tracing::warn!(job_id = %job.job_id, "Webhook job without delivery target");
                    return;
                };
                match self.webhook.send(url, &payload).await {
                    Ok(()) => {
                        tracing::info!(job_id = %job.job_id, url, "Result delivered via webhook");
                    }
                    Err(e) => {
                        tracing::error!(
                            job_id = %job.job_id,
                            url,
                            error = %e,
                            "Webhook delivery failed (not retried)",
                        );
                    }
                }
            }
        }
    }
}

/// Pull the output manifest for `prompt_id` out of a history response.
///
/// The history endpoint returns `{"<prompt_id>": {"outputs": {...}}}`;
/// a missing prompt key or outputs object means the backend has no
/// history for that run.
pub fn extract_outputs(history: &serde_json::Value, prompt_id: &str) -> Option<serde_json::Value> {
    history.get(prompt_id)?.get("outputs").cloned()
}
