//! In-memory job store.
//!
//! Mirrors the Postgres implementation's transition guards so the
//! completion path and retention sweep can be tested without a database.
//! Lookups are linear scans; this is test support, not a production
//! store.

use std::collections::HashMap;

use async_trait::async_trait;
use relay_core::types::{JobId, Timestamp};
use tokio::sync::Mutex;

use crate::models::{Job, JobStatus, NewJob};
use crate::store::{JobStore, StoreError};

/// Job store backed by a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-built row directly, bypassing the lifecycle. Lets
    /// tests stage jobs at arbitrary statuses and ages.
    pub async fn insert_raw(&self, job: Job) {
        self.jobs.lock().await.insert(job.job_id, job);
    }

    /// Snapshot every stored row, for test assertions.
    pub async fn all(&self) -> Vec<Job> {
        self.jobs.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, new: NewJob) -> Result<Job, StoreError> {
        let job = Job {
            job_id: new.job_id,
            external_execution_id: new.external_execution_id,
            comfy_prompt_id: None,
            status: JobStatus::PendingSubmission,
            delivery_mode: new.delivery_mode,
            delivery_target: new.delivery_target,
            output_format: new.output_format,
            result_manifest: None,
            created_at: chrono::Utc::now(),
        };
        self.jobs.lock().await.insert(job.job_id, job.clone());
        Ok(job)
    }

    async fn mark_queued(&self, job_id: JobId, prompt_id: &str) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::PendingSubmission => {
                job.comfy_prompt_id = Some(prompt_id.to_string());
                job.status = JobStatus::Queued;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_submission_failed(&self, job_id: JobId) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::PendingSubmission => {
                job.status = JobStatus::SubmissionFailed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_running(&self, prompt_id: &str) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .values_mut()
            .find(|j| j.comfy_prompt_id.as_deref() == Some(prompt_id));
        match job {
            Some(job) if matches!(job.status, JobStatus::Queued | JobStatus::Running) => {
                job.status = JobStatus::Running;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(
        &self,
        prompt_id: &str,
        manifest: &serde_json::Value,
    ) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .values_mut()
            .find(|j| j.comfy_prompt_id.as_deref() == Some(prompt_id));
        match job {
            Some(job) if job.status != JobStatus::Completed => {
                job.status = JobStatus::Completed;
                job.result_manifest = Some(manifest.clone());
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn get_by_id(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.lock().await.get(&job_id).cloned())
    }

    async fn get_by_prompt_id(&self, prompt_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .await
            .values()
            .find(|j| j.comfy_prompt_id.as_deref() == Some(prompt_id))
            .cloned())
    }

    async fn delete_older_than(
        &self,
        completed_cutoff: Timestamp,
        all_cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            let too_old = job.created_at < all_cutoff;
            let completed_too_old =
                job.status == JobStatus::Completed && job.created_at < completed_cutoff;
            !(too_old || completed_too_old)
        });
        Ok((before - jobs.len()) as u64)
    }
}
