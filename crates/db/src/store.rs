//! The job store contract.
//!
//! The event listener and completion handler only see this trait; the
//! Postgres implementation backs production, the in-memory one backs
//! tests. Every mutation reports whether a change was applied so the
//! completion path can detect the no-op-on-terminal-status guarantee
//! that makes duplicate completion events safe.

use async_trait::async_trait;
use relay_core::types::{JobId, Timestamp};

use crate::models::{Job, NewJob};

/// Errors surfaced by a job store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable mapping from job identifier to job record.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `pending_submission` status.
    async fn create(&self, new: NewJob) -> Result<Job, StoreError>;

    /// Record backend acceptance: set the prompt id and move to `queued`.
    ///
    /// Applies only while the job is still `pending_submission`, which
    /// keeps the prompt id immutable once set. Returns whether a change
    /// was applied.
    async fn mark_queued(&self, job_id: JobId, prompt_id: &str) -> Result<bool, StoreError>;

    /// Record backend rejection: move to `submission_failed`.
    async fn mark_submission_failed(&self, job_id: JobId) -> Result<bool, StoreError>;

    /// Move the job owning `prompt_id` to `running`.
    ///
    /// A no-op once the job is terminal; `running` may be applied any
    /// number of times before completion.
    async fn mark_running(&self, prompt_id: &str) -> Result<bool, StoreError>;

    /// Atomically transition the job owning `prompt_id` to `completed`
    /// and persist its result manifest.
    ///
    /// Returns the completed row when the transition was applied, or
    /// `None` when the job is already `completed` (or unknown). This is
    /// the idempotence boundary for duplicate completion invocations:
    /// the manifest is written exactly once.
    async fn complete(
        &self,
        prompt_id: &str,
        manifest: &serde_json::Value,
    ) -> Result<Option<Job>, StoreError>;

    /// Point lookup by relay job id.
    async fn get_by_id(&self, job_id: JobId) -> Result<Option<Job>, StoreError>;

    /// Point lookup by backend prompt id (indexed; one lookup per
    /// completion event).
    async fn get_by_prompt_id(&self, prompt_id: &str) -> Result<Option<Job>, StoreError>;

    /// Age-based bulk deletion with two thresholds: `completed` jobs
    /// created before `completed_cutoff`, and jobs of any status created
    /// before `all_cutoff`. Returns the number of rows removed.
    async fn delete_older_than(
        &self,
        completed_cutoff: Timestamp,
        all_cutoff: Timestamp,
    ) -> Result<u64, StoreError>;
}
