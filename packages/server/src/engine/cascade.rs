//! Propagating upstream edits to the affected videos.
//!
//! `prepare_*` runs inside the transaction of the mutation that caused it and
//! brings variable rows of affected videos in line with the new composition.
//! [`dispatch_recompute`] runs after commit and hands the video ids to the
//! push pipeline.

use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::{info, warn};

use super::EngineError;
use super::attach::sync_variables;
use super::impact::{Impact, impact_of_container_change, impact_of_template_change};
use super::lookup::lock_video;
use crate::dispatch::DescriptionDispatcher;

/// What a description-affecting change set in motion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct CascadeSummary {
    /// Videos whose description is recomputed, ascending.
    pub video_ids: Vec<i32>,
    /// Containers through which the videos were reached, ascending.
    pub affected_containers: Vec<i32>,
    /// False when the recompute could not be queued for every video; the
    /// change itself is committed either way.
    pub dispatched: bool,
    /// Recompute jobs actually queued. Less than `video_ids.len()` when
    /// dispatch failed part way through the batch.
    pub queued: usize,
}

/// Impact of a template content edit, with variables of every affected video
/// re-synchronized.
pub async fn prepare_template_cascade<C: ConnectionTrait>(
    conn: &C,
    template_id: i32,
) -> Result<Impact, EngineError> {
    let impact = impact_of_template_change(conn, template_id).await?;
    resync_variables(conn, &impact).await?;
    Ok(impact)
}

/// Impact of a container separator/order edit, with variables of every
/// attached video re-synchronized.
pub async fn prepare_container_cascade<C: ConnectionTrait>(
    conn: &C,
    container_id: i32,
) -> Result<Impact, EngineError> {
    let impact = impact_of_container_change(conn, container_id).await?;
    resync_variables(conn, &impact).await?;
    Ok(impact)
}

async fn resync_variables<C: ConnectionTrait>(
    conn: &C,
    impact: &Impact,
) -> Result<(), EngineError> {
    // Ascending ids keep the lock order consistent across cascades.
    for &video_id in &impact.video_ids {
        let container_id = match lock_video(conn, video_id).await {
            Ok(video) => video.container_id,
            Err(EngineError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        // Detached (or rolled back) since the impact was computed.
        let Some(container_id) = container_id else {
            continue;
        };
        let sync = sync_variables(conn, video_id, container_id).await?;
        if sync.inserted > 0 || sync.removed > 0 {
            info!(
                video_id,
                inserted = sync.inserted,
                removed = sync.removed,
                "Re-synchronized variables"
            );
        }
    }
    Ok(())
}

/// Request a recompute for every impacted video. A change that affects no
/// video is a no-op and counts as dispatched.
pub async fn dispatch_recompute(
    dispatcher: &dyn DescriptionDispatcher,
    impact: Impact,
    actor: &str,
) -> CascadeSummary {
    let (dispatched, queued) = if impact.is_empty() {
        (true, 0)
    } else {
        match dispatcher.request_recompute(&impact.video_ids, actor).await {
            Ok(()) => (true, impact.video_ids.len()),
            Err(e) => {
                warn!(
                    videos = impact.video_ids.len(),
                    queued = e.queued(),
                    error = %e,
                    "Failed to queue description recompute"
                );
                (false, e.queued())
            }
        }
    };

    CascadeSummary {
        video_ids: impact.video_ids,
        affected_containers: impact.affected_containers,
        dispatched,
        queued,
    }
}

/// Recompute for a single video after one of its variables changed.
pub async fn on_variable_changed(
    dispatcher: &dyn DescriptionDispatcher,
    video_id: i32,
    container_id: i32,
    actor: &str,
) -> CascadeSummary {
    let impact = Impact {
        video_ids: vec![video_id],
        affected_containers: vec![container_id],
    };
    dispatch_recompute(dispatcher, impact, actor).await
}
