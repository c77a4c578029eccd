//! The one-way container assignment of a video.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use super::EngineError;
use crate::entity::video;

/// Container assignment of a video.
///
/// The only transition that changes the container is `Unassigned ->
/// Assigned`; `detach` goes back to `Unassigned` from anywhere. Moving a
/// video from one container to another is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerLink {
    Unassigned,
    Assigned(i32),
}

impl ContainerLink {
    pub fn of(video: &video::Model) -> Self {
        match video.container_id {
            Some(id) => Self::Assigned(id),
            None => Self::Unassigned,
        }
    }

    pub fn container_id(self) -> Option<i32> {
        match self {
            Self::Assigned(id) => Some(id),
            Self::Unassigned => None,
        }
    }

    /// Assign `container_id`. Fails for any already assigned video, including
    /// one assigned to the same container.
    pub fn attach(self, video_id: i32, container_id: i32) -> Result<Self, EngineError> {
        match self {
            Self::Unassigned => Ok(Self::Assigned(container_id)),
            Self::Assigned(current) => Err(EngineError::AlreadyAttached {
                video_id,
                container_id: current,
            }),
        }
    }

    pub fn detach(self) -> Self {
        Self::Unassigned
    }
}

/// Persist a link transition. This is the only code that writes
/// `video.container_id`.
///
/// Assignment is a conditional update that only matches a NULL column, so a
/// concurrent attach that committed first makes this one fail instead of
/// silently replacing the container.
pub async fn store_link<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
    next: ContainerLink,
) -> Result<(), EngineError> {
    let now = Utc::now();

    match next {
        ContainerLink::Assigned(container_id) => {
            let result = video::Entity::update_many()
                .col_expr(video::Column::ContainerId, Expr::value(Some(container_id)))
                .col_expr(video::Column::UpdatedAt, Expr::value(now))
                .filter(video::Column::Id.eq(video_id))
                .filter(video::Column::ContainerId.is_null())
                .exec(conn)
                .await?;

            if result.rows_affected == 0 {
                let current = video::Entity::find_by_id(video_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Video", video_id))?;
                return Err(EngineError::AlreadyAttached {
                    video_id,
                    container_id: current.container_id.unwrap_or(container_id),
                });
            }
        }
        ContainerLink::Unassigned => {
            video::Entity::update_many()
                .col_expr(video::Column::ContainerId, Expr::value(Option::<i32>::None))
                .col_expr(video::Column::UpdatedAt, Expr::value(now))
                .filter(video::Column::Id.eq(video_id))
                .exec(conn)
                .await?;
        }
    }

    Ok(())
}
