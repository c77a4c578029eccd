//! Hand-off from committed mutations to the asynchronous push pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use common::{MqAppConfig, PushJob, RecomputeJob};
use mq::{Mq, MqError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("The push pipeline is disabled")]
    Disabled,

    #[error(transparent)]
    Queue(#[from] MqError),
}

impl DispatchError {
    /// Jobs that were queued before the request failed.
    pub fn queued(&self) -> usize {
        match self {
            Self::Disabled => 0,
            Self::Queue(e) => e.published(),
        }
    }
}

/// Durable task dispatch used by the engine.
///
/// Dispatch is fire-and-forget: success means the work was queued, not that
/// it was carried out.
#[async_trait]
pub trait DescriptionDispatcher: Send + Sync {
    /// Queue "recompute, push if changed, record history on success" for each video.
    async fn request_recompute(&self, video_ids: &[i32], actor: &str)
    -> Result<(), DispatchError>;

    /// Queue a push of an already-decided description.
    async fn request_push(&self, job: PushJob) -> Result<(), DispatchError>;
}

/// Publishes jobs to the message queue.
pub struct QueueDispatcher {
    mq: Arc<Mq>,
    config: MqAppConfig,
}

impl QueueDispatcher {
    pub fn new(mq: Arc<Mq>, config: MqAppConfig) -> Self {
        Self { mq, config }
    }
}

#[async_trait]
impl DescriptionDispatcher for QueueDispatcher {
    async fn request_recompute(
        &self,
        video_ids: &[i32],
        actor: &str,
    ) -> Result<(), DispatchError> {
        if video_ids.is_empty() {
            return Ok(());
        }

        let jobs: Vec<RecomputeJob> = video_ids
            .iter()
            .map(|&video_id| RecomputeJob::new(video_id, actor))
            .collect();
        mq::publish_all(&self.mq, &self.config.recompute_queue_name, &jobs).await?;

        info!(count = jobs.len(), actor, "Queued description recompute");
        Ok(())
    }

    async fn request_push(&self, job: PushJob) -> Result<(), DispatchError> {
        mq::publish(&self.mq, &self.config.push_queue_name, &job).await?;
        info!(
            video_id = job.video_id,
            job_id = %job.job_id,
            origin = ?job.origin,
            "Queued description push"
        );
        Ok(())
    }
}

/// Used when the queue is turned off. Every request fails with
/// [`DispatchError::Disabled`] so callers can report that nothing was queued.
pub struct DisabledDispatcher;

#[async_trait]
impl DescriptionDispatcher for DisabledDispatcher {
    async fn request_recompute(
        &self,
        video_ids: &[i32],
        _actor: &str,
    ) -> Result<(), DispatchError> {
        if video_ids.is_empty() {
            return Ok(());
        }
        warn!(count = video_ids.len(), "Push pipeline disabled, recompute not queued");
        Err(DispatchError::Disabled)
    }

    async fn request_push(&self, job: PushJob) -> Result<(), DispatchError> {
        warn!(video_id = job.video_id, "Push pipeline disabled, push not queued");
        Err(DispatchError::Disabled)
    }
}
