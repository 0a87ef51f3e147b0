//! One-shot retention sweep over the `jobs` table.
//!
//! Runs once during process startup, before the server begins accepting
//! requests. Two thresholds apply: completed jobs past the short cutoff
//! are purged, and any job past the long cutoff is purged regardless of
//! status (abandoned `pending_submission`/`queued` rows age out too).

use chrono::Utc;
use relay_db::store::JobStore;

/// Delete jobs past the retention thresholds.
///
/// * `completed_days` - age in days after which completed jobs are purged.
/// * `all_days` - age in days after which any job is purged.
///
/// A failure is logged and swallowed; retention is maintenance, not a
/// startup precondition.
pub async fn run_startup_sweep(store: &dyn JobStore, completed_days: i64, all_days: i64) {
    let now = Utc::now();
    let completed_cutoff = now - chrono::Duration::days(completed_days);
    let all_cutoff = now - chrono::Duration::days(all_days);

    match store.delete_older_than(completed_cutoff, all_cutoff).await {
        Ok(deleted) => {
            if deleted > 0 {
                tracing::info!(deleted, completed_days, all_days, "Retention sweep purged old jobs");
            } else {
                tracing::debug!(completed_days, all_days, "Retention sweep: no jobs to purge");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Retention sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_db::models::{DeliveryMode, JobStatus, NewJob, OutputFormat};
    use relay_db::InMemoryJobStore;

    use super::*;

    async fn staged_job(store: &InMemoryJobStore, status: JobStatus, age_days: i64) -> uuid::Uuid {
        let mut job = store
            .create(NewJob {
                job_id: uuid::Uuid::new_v4(),
                external_execution_id: "ext".into(),
                delivery_mode: DeliveryMode::Push,
                delivery_target: None,
                output_format: OutputFormat::Binary,
            })
            .await
            .unwrap();
        job.status = status;
        job.created_at = Utc::now() - chrono::Duration::days(age_days);
        let id = job.job_id;
        store.insert_raw(job).await;
        id
    }

    #[tokio::test]
    async fn sweep_purges_past_both_thresholds() {
        let store = InMemoryJobStore::new();
        let old_completed = staged_job(&store, JobStatus::Completed, 10).await;
        let new_completed = staged_job(&store, JobStatus::Completed, 2).await;
        let ancient_queued = staged_job(&store, JobStatus::Queued, 45).await;
        let aging_queued = staged_job(&store, JobStatus::Queued, 20).await;

        run_startup_sweep(&store, 7, 30).await;

        assert!(store.get_by_id(old_completed).await.unwrap().is_none());
        assert!(store.get_by_id(ancient_queued).await.unwrap().is_none());
        assert!(store.get_by_id(new_completed).await.unwrap().is_some());
        assert!(store.get_by_id(aging_queued).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_on_empty_store_is_noop() {
        let store = InMemoryJobStore::new();
        run_startup_sweep(&store, 7, 30).await;
    }
}
