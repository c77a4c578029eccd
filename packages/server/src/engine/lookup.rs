use std::collections::HashMap;

use sea_orm::sea_query::LockType;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use super::EngineError;
use crate::entity::{container, container_template, template, video};

/// Load a video and hold a row lock on it until the transaction ends.
///
/// Every operation that changes a video's container, variables, description
/// or history goes through this lock, which serializes them per video.
pub async fn lock_video<C: ConnectionTrait>(
    conn: &C,
    video_id: i32,
) -> Result<video::Model, EngineError> {
    video::Entity::find_by_id(video_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::not_found("Video", video_id))
}

/// Hold share locks on a container and its templates until the transaction
/// ends, so a concurrent composition or content edit either commits first
/// or waits for the caller.
///
/// Lock order across the engine is container, then templates, then videos.
pub async fn share_lock_composition<C: ConnectionTrait>(
    conn: &C,
    container_id: i32,
    owner_id: i32,
) -> Result<container::Model, EngineError> {
    let container = container::Entity::find_by_id(container_id)
        .filter(container::Column::OwnerId.eq(owner_id))
        .lock(LockType::Share)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::not_found("Container", container_id))?;

    let order = template_order(conn, container_id).await?;
    if !order.is_empty() {
        template::Entity::find()
            .filter(template::Column::Id.is_in(order))
            .order_by_asc(template::Column::Id)
            .lock(LockType::Share)
            .all(conn)
            .await?;
    }

    Ok(container)
}

/// Template ids of a container in segment order.
pub async fn template_order<C: ConnectionTrait>(
    conn: &C,
    container_id: i32,
) -> Result<Vec<i32>, EngineError> {
    let ids = container_template::Entity::find()
        .filter(container_template::Column::ContainerId.eq(container_id))
        .order_by_asc(container_template::Column::Position)
        .order_by_asc(container_template::Column::TemplateId)
        .select_only()
        .column(container_template::Column::TemplateId)
        .into_tuple::<i32>()
        .all(conn)
        .await?;
    Ok(ids)
}

/// Templates of a container in segment order.
pub async fn ordered_templates<C: ConnectionTrait>(
    conn: &C,
    container_id: i32,
) -> Result<Vec<template::Model>, EngineError> {
    let order = template_order(conn, container_id).await?;
    if order.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_id: HashMap<i32, template::Model> = template::Entity::find()
        .filter(template::Column::Id.is_in(order.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    Ok(order.iter().filter_map(|id| by_id.remove(id)).collect())
}
