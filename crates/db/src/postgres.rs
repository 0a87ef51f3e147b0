//! Postgres-backed job store.
//!
//! All status transitions are single conditional `UPDATE` statements, so
//! row-level atomicity comes from the database; no application locking.

use async_trait::async_trait;
use relay_core::types::{JobId, Timestamp};
use sqlx::PgPool;

use crate::models::{Job, JobStatus, NewJob};
use crate::store::{JobStore, StoreError};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    job_id, external_execution_id, comfy_prompt_id, status, \
    delivery_mode, delivery_target, output_format, result_manifest, \
    created_at";

/// Job store backed by the `jobs` table.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, new: NewJob) -> Result<Job, StoreError> {
        let query = format!(
            "INSERT INTO jobs \
                 (job_id, external_execution_id, status, delivery_mode, \
                  delivery_target, output_format) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(new.job_id)
            .bind(&new.external_execution_id)
            .bind(JobStatus::PendingSubmission.as_str())
            .bind(new.delivery_mode.as_str())
            .bind(&new.delivery_target)
            .bind(new.output_format.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    async fn mark_queued(&self, job_id: JobId, prompt_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE jobs SET comfy_prompt_id = $2, status = $3 \
             WHERE job_id = $1 AND status = $4",
        )
        .bind(job_id)
        .bind(prompt_id)
        .bind(JobStatus::Queued.as_str())
        .bind(JobStatus::PendingSubmission.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_submission_failed(&self, job_id: JobId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE jobs SET status = $2 WHERE job_id = $1 AND status = $3")
            .bind(job_id)
            .bind(JobStatus::SubmissionFailed.as_str())
            .bind(JobStatus::PendingSubmission.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_running(&self, prompt_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $2 \
             WHERE comfy_prompt_id = $1 AND status IN ($3, $2)",
        )
        .bind(prompt_id)
        .bind(JobStatus::Running.as_str())
        .bind(JobStatus::Queued.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete(
        &self,
        prompt_id: &str,
        manifest: &serde_json::Value,
    ) -> Result<Option<Job>, StoreError> {
        // The status guard makes duplicate invocations a detectable no-op
        // and keeps `result_manifest` write-once.
        let query = format!(
            "UPDATE jobs SET status = $2, result_manifest = $3 \
             WHERE comfy_prompt_id = $1 AND status <> $2 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(prompt_id)
            .bind(JobStatus::Completed.as_str())
            .bind(manifest)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn get_by_id(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE job_id = $1");
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn get_by_prompt_id(&self, prompt_id: &str) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE comfy_prompt_id = $1");
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(prompt_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn delete_older_than(
        &self,
        completed_cutoff: Timestamp,
        all_cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM jobs \
             WHERE created_at < $2 \
                OR (status = $3 AND created_at < $1)",
        )
        .bind(completed_cutoff)
        .bind(all_cutoff)
        .bind(JobStatus::Completed.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
