use std::sync::Arc;

use common::{PushOutcome, PushResult, SyncStatus};
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{error, info, warn};

use crate::engine::EngineError;
use crate::engine::ledger::{CommitOutcome, append_committed, set_sync_status};
use crate::engine::lookup::lock_video;

/// Consume push results published by the worker.
pub async fn consume_push_results(db: DatabaseConnection, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting push result consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded for sequential ledger writes
            None,
            move |message: BrokerMessage<PushResult>| {
                let db = db.clone();
                async move {
                    let result = message.payload;
                    let video_id = result.video_id;
                    let job_id = result.job_id.clone();

                    if let Err(e) = process_push_result(&db, result).await {
                        error!(
                            video_id,
                            job_id = %job_id,
                            error = %e,
                            "Failed to process push result"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Push result consumer stopped unexpectedly");
    }
}

/// Apply a push result to the ledger and the video's sync state.
///
/// A confirmed recompute push appends history (once per push job). A confirmed
/// restore push only marks the video synced, since its entry was recorded
/// when the rollback committed. A failed push never touches history.
pub async fn process_push_result(db: &DatabaseConnection, result: PushResult) -> anyhow::Result<()> {
    match &result.outcome {
        PushOutcome::Pushed if result.origin.records_history() => {
            let outcome = match append_committed(
                db,
                result.video_id,
                &result.description,
                &result.actor,
                &result.job_id,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(EngineError::NotFound(_)) => {
                    warn!(video_id = result.video_id, "Pushed video no longer exists");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if let CommitOutcome::AlreadyRecorded(entry) = outcome {
                info!(
                    video_id = result.video_id,
                    job_id = %result.job_id,
                    version_number = entry.version_number,
                    "Push result already processed, skipping"
                );
            }
        }
        PushOutcome::Pushed => {
            let txn = db.begin().await?;
            let video = match lock_video(&txn, result.video_id).await {
                Ok(video) => video,
                Err(EngineError::NotFound(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            // A later change may have replaced the restored text already.
            if video.current_description == result.description {
                set_sync_status(&txn, video.id, SyncStatus::Synced, None).await?;
                info!(video_id = video.id, job_id = %result.job_id, "Restored description synced");
            }
            txn.commit().await?;
        }
        PushOutcome::Failed { error, attempts } => {
            warn!(
                video_id = result.video_id,
                job_id = %result.job_id,
                attempts,
                error = %error,
                "Description push failed"
            );
            set_sync_status(db, result.video_id, SyncStatus::Failed, Some(error.clone())).await?;
        }
    }

    Ok(())
}
