use std::sync::Arc;

use common::{PushJob, PushOrigin, RecomputeJob, SyncStatus};
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{error, info};

use crate::dispatch::DescriptionDispatcher;
use crate::engine::EngineError;
use crate::engine::ledger::set_sync_status;
use crate::engine::lookup::lock_video;
use crate::engine::recompute::render_video;

/// What handling one recompute job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecomputeAction {
    /// A push of the rendered text was queued.
    Pushed { job_id: String },
    /// The rendered text already is the synced description.
    Unchanged,
    /// The video was detached (or deleted) after the job was queued.
    Skipped,
}

/// Consume recompute jobs published by the cascade.
pub async fn consume_recompute_jobs(
    db: DatabaseConnection,
    mq: Arc<Mq>,
    dispatcher: Arc<dyn DescriptionDispatcher>,
    queue_name: String,
) {
    info!(queue = %queue_name, "Starting recompute consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None,
            None,
            move |message: BrokerMessage<RecomputeJob>| {
                let db = db.clone();
                let dispatcher = Arc::clone(&dispatcher);
                async move {
                    let job = message.payload;
                    let video_id = job.video_id;
                    let job_id = job.job_id.clone();

                    if let Err(e) = process_recompute_job(&db, dispatcher.as_ref(), job).await {
                        error!(
                            video_id,
                            job_id = %job_id,
                            error = %e,
                            "Failed to process recompute job"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Recompute consumer stopped unexpectedly");
    }
}

/// Render the video's description from fresh reads and queue a push when it
/// differs from the stored description.
pub async fn process_recompute_job(
    db: &DatabaseConnection,
    dispatcher: &dyn DescriptionDispatcher,
    job: RecomputeJob,
) -> anyhow::Result<RecomputeAction> {
    let txn = db.begin().await?;

    let video = match lock_video(&txn, job.video_id).await {
        Ok(video) => video,
        Err(EngineError::NotFound(_)) => {
            info!(video_id = job.video_id, "Video no longer exists, skipping recompute");
            return Ok(RecomputeAction::Skipped);
        }
        Err(e) => return Err(e.into()),
    };

    let Some(description) = render_video(&txn, &video).await? else {
        info!(video_id = video.id, "Video is detached, skipping recompute");
        return Ok(RecomputeAction::Skipped);
    };

    if description == video.current_description && video.sync_status == SyncStatus::Synced {
        return Ok(RecomputeAction::Unchanged);
    }

    set_sync_status(&txn, video.id, SyncStatus::Pending, None).await?;
    txn.commit().await?;

    let push = PushJob::new(
        video.id,
        video.external_id,
        description,
        job.actor,
        PushOrigin::Recompute,
    );
    let job_id = push.job_id.clone();
    dispatcher.request_push(push).await?;

    info!(video_id = video.id, push_job_id = %job_id, "Queued push of recomputed description");
    Ok(RecomputeAction::Pushed { job_id })
}
