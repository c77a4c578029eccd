//! Push execution with retries.

use common::retry::{RetryDecision, RetryState};
use common::{PushJob, PushOutcome, PushResult, RetryConfig};
use tracing::{error, info, warn};

use crate::platform::VideoPlatform;

/// Push `job` to the platform, retrying transient failures with backoff.
///
/// Always produces a result: a job that cannot be pushed yields
/// [`PushOutcome::Failed`] with the last error and the number of attempts.
pub async fn execute_push(
    job: &PushJob,
    platform: &dyn VideoPlatform,
    retry: &RetryConfig,
) -> PushResult {
    let mut state = RetryState::new(retry);

    loop {
        let err = match platform
            .update_description(&job.external_id, &job.description)
            .await
        {
            Ok(()) => {
                info!(
                    video_id = job.video_id,
                    job_id = %job.job_id,
                    attempts = state.attempts() + 1,
                    "Description pushed"
                );
                return PushResult::from_job(job, PushOutcome::Pushed);
            }
            Err(e) => e,
        };

        let retryable = err.is_retryable();
        let error = err.to_string();
        match state.record_failure(error.clone()) {
            RetryDecision::Retry { delay } if retryable => {
                warn!(
                    video_id = job.video_id,
                    job_id = %job.job_id,
                    attempt = state.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Push failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            _ => {
                error!(
                    video_id = job.video_id,
                    job_id = %job.job_id,
                    attempts = state.attempts(),
                    retryable,
                    error = %error,
                    "Giving up on push"
                );
                return PushResult::from_job(
                    job,
                    PushOutcome::Failed {
                        error,
                        attempts: state.attempts(),
                    },
                );
            }
        }
    }
}
