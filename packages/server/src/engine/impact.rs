//! Which videos must be re-rendered after an upstream change.

use std::collections::BTreeSet;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{container_template, video};

/// Videos (and the containers through which they were reached) affected by a
/// change. Both lists are sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Impact {
    pub video_ids: Vec<i32>,
    pub affected_containers: Vec<i32>,
}

impl Impact {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.video_ids.is_empty()
    }
}

/// Every video attached to a container that uses `template_id`.
///
/// Containership is not cached anywhere, so this always reads the current
/// composition.
pub async fn impact_of_template_change<C: ConnectionTrait>(
    conn: &C,
    template_id: i32,
) -> Result<Impact, DbErr> {
    let container_ids: BTreeSet<i32> = container_template::Entity::find()
        .filter(container_template::Column::TemplateId.eq(template_id))
        .select_only()
        .column(container_template::Column::ContainerId)
        .into_tuple::<i32>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let affected_containers: Vec<i32> = container_ids.into_iter().collect();
    let video_ids = attached_videos(conn, &affected_containers).await?;

    Ok(Impact {
        video_ids,
        affected_containers,
    })
}

/// Every video attached to `container_id`.
pub async fn impact_of_container_change<C: ConnectionTrait>(
    conn: &C,
    container_id: i32,
) -> Result<Impact, DbErr> {
    let video_ids = attached_videos(conn, &[container_id]).await?;
    Ok(Impact {
        video_ids,
        affected_containers: vec![container_id],
    })
}

async fn attached_videos<C: ConnectionTrait>(
    conn: &C,
    container_ids: &[i32],
) -> Result<Vec<i32>, DbErr> {
    if container_ids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: BTreeSet<i32> = video::Entity::find()
        .filter(video::Column::ContainerId.is_in(container_ids.to_vec()))
        .select_only()
        .column(video::Column::Id)
        .into_tuple::<i32>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    Ok(ids.into_iter().collect())
}

/// Whether a template edit changes any rendered description. Renames do not.
pub fn template_edit_affects_output(current_content: &str, new_content: Option<&str>) -> bool {
    new_content.is_some_and(|content| content != current_content)
}

/// Whether a container edit changes any rendered description. Only the
/// separator and the template order matter.
pub fn container_edit_affects_output(
    current_separator: &str,
    new_separator: Option<&str>,
    order_changed: bool,
) -> bool {
    order_changed || new_separator.is_some_and(|separator| separator != current_separator)
}
