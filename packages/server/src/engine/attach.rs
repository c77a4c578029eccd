//! Attaching and detaching videos, and keeping their variable rows in step
//! with the container they are attached to.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use common::{VariableKind, extract_variables};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;

use super::EngineError;
use super::link::{ContainerLink, store_link};
use super::lookup::{lock_video, ordered_templates, share_lock_composition};
use crate::entity::{variable, video};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    pub video_id: i32,
    pub container_id: i32,
    pub variables_seeded: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachOutcome {
    pub video_id: i32,
    pub container_id: i32,
    pub variables_cleared: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableSync {
    pub inserted: u64,
    pub removed: u64,
}

/// Attach a video to a container and seed one empty variable per placeholder
/// of every template in the container.
///
/// The container must belong to the video's owner. Attaching an already
/// attached video fails with [`EngineError::AlreadyAttached`]. The container
/// and its templates stay share-locked until commit, so a concurrent template
/// edit either lands before the variables are seeded or sees this video in
/// its impact.
pub async fn attach(
    db: &DatabaseConnection,
    video_id: i32,
    container_id: i32,
) -> Result<AttachOutcome, EngineError> {
    let txn = db.begin().await?;

    let owner_id = video::Entity::find_by_id(video_id)
        .one(&txn)
        .await?
        .ok_or_else(|| EngineError::not_found("Video", video_id))?
        .owner_id;
    share_lock_composition(&txn, container_id, owner_id).await?;

    let video = lock_video(&txn, video_id).await?;

    let next = ContainerLink::of(&video).attach(video_id, container_id)?;
    store_link(&txn, video_id, next).await?;
    let variables_seeded = sync_variables(&txn, video_id, container_id).await?.inserted;

    txn.commit().await?;

    info!(video_id, container_id, variables_seeded, "Attached video to container");

    Ok(AttachOutcome {
        video_id,
        container_id,
        variables_seeded,
    })
}

/// Return a video to manual control: clear its container and delete all of
/// its variables.
pub async fn detach(db: &DatabaseConnection, video_id: i32) -> Result<DetachOutcome, EngineError> {
    let txn = db.begin().await?;

    let video = lock_video(&txn, video_id).await?;
    let link = ContainerLink::of(&video);
    let Some(container_id) = link.container_id() else {
        return Err(EngineError::NotAttached { video_id });
    };

    store_link(&txn, video_id, link.detach()).await?;
    let variables_cleared = clear_variables(&txn, video_id).await?;

    txn.commit().await?;

    info!(video_id, container_id, variables_cleared, "Detached video from container");

    Ok(DetachOutcome {
        video_id,
        container_id,
        variables_cleared,
    })
}

/// Bring a video's variable rows in line with the placeholders of its
/// container: insert missing rows with an empty value and delete rows whose
/// placeholder no longer exists. Existing values are never overwritten.
pub async fn sync_variables<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
    container_id: i32,
) -> Result<VariableSync, EngineError> {
    let mut wanted: BTreeSet<(i32, String)> = BTreeSet::new();
    for template in ordered_templates(conn, container_id).await? {
        for name in extract_variables(&template.content) {
            wanted.insert((template.id, name));
        }
    }

    let existing: HashSet<(i32, String)> = variable::Entity::find()
        .filter(variable::Column::VideoId.eq(video_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|row| (row.template_id, row.name))
        .collect();

    let mut removed = 0;
    for (template_id, name) in existing.iter().filter(|key| !wanted.contains(*key)) {
        removed += variable::Entity::delete_by_id((video_id, *template_id, name.clone()))
            .exec(conn)
            .await?
            .rows_affected;
    }

    let missing: Vec<(i32, String)> = wanted
        .into_iter()
        .filter(|key| !existing.contains(key))
        .collect();
    let inserted = insert_missing(conn, video_id, missing).await?;

    Ok(VariableSync { inserted, removed })
}

/// Insert empty variable rows, ignoring rows that already exist so a retried
/// or concurrent sync never duplicates or overwrites a value.
async fn insert_missing<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
    keys: Vec<(i32, String)>,
) -> Result<u64, EngineError> {
    if keys.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let rows = keys.into_iter().map(|(template_id, name)| variable::ActiveModel {
        video_id: Set(video_id),
        template_id: Set(template_id),
        name: Set(name),
        value: Set(String::new()),
        kind: Set(VariableKind::Text.to_string()),
        updated_at: Set(now),
    });

    let result = variable::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([
                variable::Column::VideoId,
                variable::Column::TemplateId,
                variable::Column::Name,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(inserted) => Ok(inserted),
        Err(DbErr::RecordNotInserted) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Delete every variable of a video, returning how many rows were removed.
pub async fn clear_variables<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
) -> Result<u64, EngineError> {
    let result = variable::Entity::delete_many()
        .filter(variable::Column::VideoId.eq(video_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
