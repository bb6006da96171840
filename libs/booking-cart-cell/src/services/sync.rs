use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::{CartConfig, CartError, SyncJob, SyncOperation, SyncOutcome};
use crate::services::remote::SchedulingApi;

/// Runs remote mutations in the background, retrying a bounded number of times.
///
/// Callers never wait on the outcome to update local state. Jobs that exhaust their
/// retries land in the failure ledger, where a later reconciliation pass can pick them up.
#[derive(Clone)]
pub struct SyncDispatcher {
    api: Arc<dyn SchedulingApi>,
    max_retries: u32,
    retry_delay: Duration,
    failures: Arc<RwLock<Vec<SyncJob>>>,
}

impl SyncDispatcher {
    pub fn new(api: Arc<dyn SchedulingApi>, config: &CartConfig) -> Self {
        Self {
            api,
            max_retries: config.sync_max_retries,
            retry_delay: Duration::from_millis(config.sync_retry_delay_ms),
            failures: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn dispatch(&self, subject_id: &str, item_id: &str, operation: SyncOperation) -> JoinHandle<SyncOutcome> {
        let job = SyncJob::new(subject_id, item_id, operation, self.max_retries);
        let api = self.api.clone();
        let failures = self.failures.clone();
        let delay = self.retry_delay;

        tokio::spawn(async move { run_job(api, job, delay, failures).await })
    }

    pub async fn failed_jobs(&self) -> Vec<SyncJob> {
        self.failures.read().await.clone()
    }

    /// Drains the failure ledger.
    pub async fn take_failed_jobs(&self) -> Vec<SyncJob> {
        std::mem::take(&mut *self.failures.write().await)
    }
}

#[instrument(skip(api, delay, failures), fields(job_id = %job.job_id, item_id = %job.item_id))]
async fn run_job(
    api: Arc<dyn SchedulingApi>,
    mut job: SyncJob,
    delay: Duration,
    failures: Arc<RwLock<Vec<SyncJob>>>,
) -> SyncOutcome {
    loop {
        match perform(api.as_ref(), &job.operation).await {
            Ok(()) => {
                let attempts = job.retry_count + 1;
                info!("Synced cart item {} for subject {} after {} attempt(s)", job.item_id, job.subject_id, attempts);
                return SyncOutcome::Synced { attempts };
            }
            Err(e) => {
                job.last_error = Some(e.to_string());

                if job.can_retry() {
                    job.retry_count += 1;
                    warn!(
                        "Sync of cart item {} failed (retry {}/{}): {}",
                        job.item_id, job.retry_count, job.max_retries, e
                    );
                    tokio::time::sleep(delay * job.retry_count).await;
                    continue;
                }

                let attempts = job.retry_count + 1;
                error!(
                    "Giving up syncing cart item {} for subject {} after {} attempt(s): {}",
                    job.item_id, job.subject_id, attempts, e
                );
                failures.write().await.push(job);
                return SyncOutcome::Failed { attempts, error: e.to_string() };
            }
        }
    }
}

async fn perform(api: &dyn SchedulingApi, operation: &SyncOperation) -> Result<(), CartError> {
    match operation {
        SyncOperation::UpdateSchedule { kind, remote_id, scheduled_at } => {
            api.update_booking_schedule(*kind, *remote_id, *scheduled_at).await
        }
    }
}
