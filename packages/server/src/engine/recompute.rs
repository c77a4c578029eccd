//! Rendering a video's description from the stored inputs.

use std::collections::HashMap;

use common::{Segment, build_scoped};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use super::EngineError;
use super::lookup::ordered_templates;
use crate::entity::{container, variable, video};

/// Render the description a video would get from its container's templates
/// and its variable values. `None` when the video is not attached.
///
/// Variables with an empty value are left out so their placeholder stays
/// visible in the output.
pub async fn render_video<C: ConnectionTrait>(
    conn: &C,
    video: &video::Model,
) -> Result<Option<String>, EngineError> {
    let Some(container_id) = video.container_id else {
        return Ok(None);
    };

    let container = container::Entity::find_by_id(container_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::not_found("Container", container_id))?;
    let templates = ordered_templates(conn, container_id).await?;

    let values = values_by_template(conn, video.id).await?;
    let empty = HashMap::new();
    let segments: Vec<Segment<'_>> = templates
        .iter()
        .map(|t| Segment {
            content: &t.content,
            values: values.get(&t.id).unwrap_or(&empty),
        })
        .collect();

    Ok(Some(build_scoped(&segments, &container.separator)))
}

/// Non-empty variable values of a video, grouped by template.
pub async fn values_by_template<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
) -> Result<HashMap<i32, HashMap<String, String>>, EngineError> {
    let rows = variable::Entity::find()
        .filter(variable::Column::VideoId.eq(video_id))
        .all(conn)
        .await?;

    let mut grouped: HashMap<i32, HashMap<String, String>> = HashMap::new();
    for row in rows.into_iter().filter(|row| !row.value.is_empty()) {
        grouped
            .entry(row.template_id)
            .or_default()
            .insert(row.name, row.value);
    }
    Ok(grouped)
}
