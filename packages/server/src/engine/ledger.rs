//! Append-only, per-video numbered log of committed descriptions.

use chrono::Utc;
use common::SyncStatus;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{info, warn};

use super::EngineError;
use super::lookup::lock_video;
use crate::entity::{description_history, video};

const APPEND_ATTEMPTS: usize = 3;

/// Result of [`append_committed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Appended(description_history::Model),
    /// The push job already produced an entry; nothing was written.
    AlreadyRecorded(description_history::Model),
}

impl CommitOutcome {
    pub fn entry(&self) -> &description_history::Model {
        match self {
            Self::Appended(entry) | Self::AlreadyRecorded(entry) => entry,
        }
    }
}

pub struct HistoryLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> HistoryLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Append an entry numbered one past the current highest version.
    ///
    /// The caller must hold the video's row lock (see
    /// [`lock_video`]) in the same transaction.
    pub async fn append(
        &self,
        video_id: i32,
        description: &str,
        actor: &str,
        push_job_id: Option<&str>,
    ) -> Result<description_history::Model, EngineError> {
        let version_number = self
            .latest(video_id)
            .await?
            .map_or(1, |entry| entry.version_number + 1);

        let model = description_history::ActiveModel {
            video_id: Set(video_id),
            version_number: Set(version_number),
            description: Set(description.to_string()),
            actor: Set(actor.to_string()),
            push_job_id: Set(push_job_id.map(str::to_string)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(self.conn).await {
            Ok(entry) => Ok(entry),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(EngineError::VersionConflict { video_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Entries of a video, newest first.
    pub async fn list(&self, video_id: i32) -> Result<Vec<description_history::Model>, DbErr> {
        description_history::Entity::find()
            .filter(description_history::Column::VideoId.eq(video_id))
            .order_by_desc(description_history::Column::VersionNumber)
            .all(self.conn)
            .await
    }

    /// The entry with the highest version, if any.
    pub async fn latest(
        &self,
        video_id: i32,
    ) -> Result<Option<description_history::Model>, DbErr> {
        description_history::Entity::find()
            .filter(description_history::Column::VideoId.eq(video_id))
            .order_by_desc(description_history::Column::VersionNumber)
            .one(self.conn)
            .await
    }

    /// A single entry, only if it belongs to `video_id`.
    pub async fn find_for_video(
        &self,
        video_id: i32,
        history_id: i32,
    ) -> Result<description_history::Model, EngineError> {
        description_history::Entity::find_by_id(history_id)
            .filter(description_history::Column::VideoId.eq(video_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::not_found("History entry", history_id))
    }

    pub async fn find_by_push_job(
        &self,
        push_job_id: &str,
    ) -> Result<Option<description_history::Model>, DbErr> {
        description_history::Entity::find()
            .filter(description_history::Column::PushJobId.eq(push_job_id))
            .one(self.conn)
            .await
    }
}

/// Set a video's sync status and last push error.
pub async fn set_sync_status<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
    status: SyncStatus,
    last_push_error: Option<String>,
) -> Result<(), DbErr> {
    video::Entity::update_many()
        .col_expr(video::Column::SyncStatus, Expr::value(status))
        .col_expr(video::Column::LastPushError, Expr::value(last_push_error))
        .col_expr(video::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(video::Column::Id.eq(video_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Record a description confirmed on the platform: append it to the ledger and
/// make it the video's current, synced description, in one transaction.
///
/// Redelivery of the same push job is a no-op. Version conflicts are retried.
pub async fn append_committed(
    db: &DatabaseConnection,
    video_id: i32,
    description: &str,
    actor: &str,
    push_job_id: &str,
) -> Result<CommitOutcome, EngineError> {
    let mut attempt = 1;
    loop {
        match try_append_committed(db, video_id, description, actor, push_job_id).await {
            Err(EngineError::VersionConflict { .. }) if attempt < APPEND_ATTEMPTS => {
                warn!(video_id, attempt, "History version conflict, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

async fn try_append_committed(
    db: &DatabaseConnection,
    video_id: i32,
    description: &str,
    actor: &str,
    push_job_id: &str,
) -> Result<CommitOutcome, EngineError> {
    let txn = db.begin().await?;
    lock_video(&txn, video_id).await?;

    let ledger = HistoryLedger::new(&txn);
    if let Some(existing) = ledger.find_by_push_job(push_job_id).await? {
        txn.commit().await?;
        return Ok(CommitOutcome::AlreadyRecorded(existing));
    }

    let entry = ledger
        .append(video_id, description, actor, Some(push_job_id))
        .await?;

    video::Entity::update_many()
        .col_expr(
            video::Column::CurrentDescription,
            Expr::value(description.to_string()),
        )
        .col_expr(video::Column::SyncStatus, Expr::value(SyncStatus::Synced))
        .col_expr(video::Column::LastPushError, Expr::value(Option::<String>::None))
        .col_expr(video::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(video::Column::Id.eq(video_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    info!(
        video_id,
        version_number = entry.version_number,
        push_job_id,
        "Recorded pushed description"
    );
    Ok(CommitOutcome::Appended(entry))
}
