//! Point-in-time restore of a video's description.

use chrono::Utc;
use common::{PushJob, PushOrigin, SyncStatus};
use sea_orm::prelude::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use super::EngineError;
use super::attach::clear_variables;
use super::ledger::HistoryLedger;
use super::link::{ContainerLink, store_link};
use super::lookup::lock_video;
use crate::dispatch::DescriptionDispatcher;
use crate::entity::{variable, video};

/// What a rollback changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct RollbackOutcome {
    pub restored_description: String,
    /// True if the video was attached to a container before the rollback.
    pub delinked_container: bool,
    pub variables_cleared: u64,
    /// Version of the history entry the rollback appended.
    pub version_number: i32,
    pub push_job_id: String,
}

/// Restore the text of history entry `history_id` as the video's description.
///
/// Restoring takes the video out of template control: it is detached from its
/// container and all of its variables are deleted. The restored text is
/// recorded as a new history entry before the push is requested, so a failed
/// push request leaves the local state committed and reports
/// [`EngineError::PushRequest`].
pub async fn rollback(
    db: &DatabaseConnection,
    dispatcher: &dyn DescriptionDispatcher,
    owner_id: i32,
    video_id: i32,
    history_id: i32,
    actor: &str,
) -> Result<RollbackOutcome, EngineError> {
    let txn = db.begin().await?;
    let ledger = HistoryLedger::new(&txn);

    let video = lock_video(&txn, video_id).await?;
    if video.owner_id != owner_id {
        return Err(EngineError::not_found("Video", video_id));
    }
    let target = ledger.find_for_video(video_id, history_id).await?;

    let link = ContainerLink::of(&video);
    let delinked_container = link.container_id().is_some();
    if delinked_container {
        store_link(&txn, video_id, link.detach()).await?;
    }

    let existing_variables = variable::Entity::find()
        .filter(variable::Column::VideoId.eq(video_id))
        .count(&txn)
        .await?;
    let variables_cleared = if existing_variables > 0 {
        clear_variables(&txn, video_id).await?
    } else {
        0
    };

    video::Entity::update_many()
        .col_expr(
            video::Column::CurrentDescription,
            Expr::value(target.description.clone()),
        )
        .col_expr(video::Column::SyncStatus, Expr::value(SyncStatus::Pending))
        .col_expr(video::Column::LastPushError, Expr::value(Option::<String>::None))
        .col_expr(video::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(video::Column::Id.eq(video_id))
        .exec(&txn)
        .await?;

    let entry = ledger
        .append(video_id, &target.description, actor, None)
        .await?;

    txn.commit().await?;

    info!(
        video_id,
        history_id,
        version_number = entry.version_number,
        delinked_container,
        variables_cleared,
        "Rolled back description"
    );

    let job = PushJob::new(
        video_id,
        video.external_id,
        target.description.clone(),
        actor,
        PushOrigin::Restore,
    );
    let push_job_id = job.job_id.clone();

    if let Err(e) = dispatcher.request_push(job).await {
        warn!(video_id, error = %e, "Rollback recorded but push was not queued");
        return Err(EngineError::PushRequest {
            video_id,
            version_number: entry.version_number,
            message: e.to_string(),
        });
    }

    Ok(RollbackOutcome {
        restored_description: target.description,
        delinked_container,
        variables_cleared,
        version_number: entry.version_number,
        push_job_id,
    })
}
