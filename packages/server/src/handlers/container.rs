use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{build_description, extract_variables};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::{info, instrument};

use crate::engine::cascade::{dispatch_recompute, prepare_container_cascade};
use crate::engine::impact::{Impact, container_edit_affects_output};
use crate::engine::lookup::{ordered_templates, template_order};
use crate::entity::{container, container_template, template, video};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::container::*;
use crate::models::render::PreviewResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "",
    tag = "Containers",
    operation_id = "createContainer",
    summary = "Create a container",
    description = "Creates an ordered composition of the caller's templates. Each template may appear at most once.",
    request_body = CreateContainerRequest,
    responses(
        (status = 201, description = "Container created", body = ContainerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "A template was not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_container(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContainerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_container(&payload)?;

    let txn = state.db.begin().await?;

    ensure_templates_owned(&txn, &payload.template_ids, auth_user.user_id).await?;

    let now = chrono::Utc::now();
    let model = container::ActiveModel {
        owner_id: Set(auth_user.user_id),
        name: Set(payload.name.trim().to_string()),
        separator: Set(payload.separator),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    write_template_order(&txn, model.id, &payload.template_ids).await?;
    let response = container_response(&txn, model).await?;

    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "",
    tag = "Containers",
    operation_id = "listContainers",
    summary = "List containers with pagination and search",
    description = "Returns the caller's containers, newest first.",
    params(ContainerListQuery),
    responses(
        (status = 200, description = "List of containers", body = ContainerListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_containers(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ContainerListQuery>,
) -> Result<Json<ContainerListResponse>, AppError> {
    let (page, per_page) = crate::models::shared::page_params(query.page, query.per_page);

    let mut select =
        container::Entity::find().filter(container::Column::OwnerId.eq(auth_user.user_id));

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(container::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(container::Column::CreatedAt)
        .order_by_desc(container::Column::Id)
        .select_only()
        .column(container::Column::Id)
        .column(container::Column::Name)
        .column(container::Column::CreatedAt)
        .column(container::Column::UpdatedAt)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .into_model::<ContainerListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(ContainerListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Containers",
    operation_id = "getContainer",
    summary = "Get a container by ID",
    description = "Returns the container with its templates in segment order.",
    params(("id" = i32, Path, description = "Container ID")),
    responses(
        (status = 200, description = "Container details", body = ContainerResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_container(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContainerResponse>, AppError> {
    let model = find_container(&state.db, id, auth_user.user_id, false).await?;
    Ok(Json(container_response(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Containers",
    operation_id = "updateContainer",
    summary = "Update a container",
    description = "Partially updates a container's name and separator. A separator change queues a recompute for every attached video; a rename affects no video.",
    params(("id" = i32, Path, description = "Container ID")),
    request_body = UpdateContainerRequest,
    responses(
        (status = 200, description = "Container updated", body = ContainerUpdateResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_container(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateContainerRequest>,
) -> Result<Json<ContainerUpdateResponse>, AppError> {
    validate_update_container(&payload)?;

    if payload == UpdateContainerRequest::default() {
        let existing = find_container(&state.db, id, auth_user.user_id, false).await?;
        return Ok(Json(ContainerUpdateResponse {
            container: container_response(&state.db, existing).await?,
            cascade: Default::default(),
        }));
    }

    let txn = state.db.begin().await?;

    let existing = find_container(&txn, id, auth_user.user_id, true).await?;
    let separator_changed =
        container_edit_affects_output(&existing.separator, payload.separator.as_deref(), false);

    let mut active: container::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(separator) = payload.separator {
        active.separator = Set(separator);
    }
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&txn).await?;

    let impact = if separator_changed {
        prepare_container_cascade(&txn, id).await?
    } else {
        Impact::none()
    };
    let response = container_response(&txn, model).await?;

    txn.commit().await?;

    let cascade = dispatch_recompute(state.dispatcher.as_ref(), impact, &auth_user.username).await;

    Ok(Json(ContainerUpdateResponse {
        container: response,
        cascade,
    }))
}

#[utoipa::path(
    put,
    path = "/{id}/templates",
    tag = "Containers",
    operation_id = "replaceContainerTemplates",
    summary = "Replace a container's template order",
    description = "Replaces the ordered template list. When the order changes, the variables of every attached video are re-synchronized (new placeholders seeded empty, removed ones deleted) and a recompute is queued for them.",
    params(("id" = i32, Path, description = "Container ID")),
    request_body = ReplaceTemplatesRequest,
    responses(
        (status = 200, description = "Template order replaced", body = ContainerUpdateResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container or template not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn replace_container_templates(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ReplaceTemplatesRequest>,
) -> Result<Json<ContainerUpdateResponse>, AppError> {
    validate_replace_templates(&payload)?;

    let txn = state.db.begin().await?;

    let existing = find_container(&txn, id, auth_user.user_id, true).await?;
    ensure_templates_owned(&txn, &payload.template_ids, auth_user.user_id).await?;

    let current = template_order(&txn, id).await?;
    let order_changed = current != payload.template_ids;

    let impact = if order_changed {
        write_template_order(&txn, id, &payload.template_ids).await?;

        let mut active: container::ActiveModel = existing.into();
        active.updated_at = Set(chrono::Utc::now());
        active.update(&txn).await?;

        prepare_container_cascade(&txn, id).await?
    } else {
        Impact::none()
    };

    let model = find_container(&txn, id, auth_user.user_id, false).await?;
    let response = container_response(&txn, model).await?;

    txn.commit().await?;

    let cascade = dispatch_recompute(state.dispatcher.as_ref(), impact, &auth_user.username).await;
    if order_changed {
        info!(
            container_id = id,
            templates = payload.template_ids.len(),
            videos = cascade.video_ids.len(),
            "Container composition changed"
        );
    }

    Ok(Json(ContainerUpdateResponse {
        container: response,
        cascade,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Containers",
    operation_id = "deleteContainer",
    summary = "Delete a container",
    description = "Deletes a container and its template order. Templates are kept. Returns 409 CONFLICT while any video is attached.",
    params(("id" = i32, Path, description = "Container ID")),
    responses(
        (status = 204, description = "Container deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Videos are attached (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_container(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let _container = find_container(&txn, id, auth_user.user_id, true).await?;

    let attached = video::Entity::find()
        .filter(video::Column::ContainerId.eq(id))
        .count(&txn)
        .await?;
    if attached > 0 {
        return Err(AppError::Conflict(format!(
            "Cannot delete container with {attached} attached video(s)"
        )));
    }

    container_template::Entity::delete_many()
        .filter(container_template::Column::ContainerId.eq(id))
        .exec(&txn)
        .await?;
    container::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/variables",
    tag = "Containers",
    operation_id = "listContainerVariables",
    summary = "List the placeholders of a container",
    description = "Returns every placeholder of every template in segment order. A video attached to the container gets one variable per entry.",
    params(("id" = i32, Path, description = "Container ID")),
    responses(
        (status = 200, description = "Container placeholders", body = ContainerVariablesResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_container_variables(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContainerVariablesResponse>, AppError> {
    find_container(&state.db, id, auth_user.user_id, false).await?;

    let data = ordered_templates(&state.db, id)
        .await?
        .into_iter()
        .flat_map(|t| {
            extract_variables(&t.content)
                .into_iter()
                .map(move |name| ContainerVariable {
                    template_id: t.id,
                    template_name: t.name.clone(),
                    name,
                })
        })
        .collect();

    Ok(Json(ContainerVariablesResponse { data }))
}

#[utoipa::path(
    post,
    path = "/{id}/preview",
    tag = "Containers",
    operation_id = "previewContainer",
    summary = "Preview a container with ad-hoc values",
    description = "Renders the container with one value map shared by all templates. Placeholders without a value stay verbatim. Nothing is stored.",
    params(("id" = i32, Path, description = "Container ID")),
    request_body = ContainerPreviewRequest,
    responses(
        (status = 200, description = "Rendered description", body = PreviewResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn preview_container(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ContainerPreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let container = find_container(&state.db, id, auth_user.user_id, false).await?;
    let contents: Vec<String> = ordered_templates(&state.db, id)
        .await?
        .into_iter()
        .map(|t| t.content)
        .collect();

    Ok(Json(PreviewResponse {
        description: build_description(&contents, &payload.values, &container.separator),
    }))
}

async fn find_container<C: ConnectionTrait>(
    db: &C,
    id: i32,
    owner_id: i32,
    for_update: bool,
) -> Result<container::Model, AppError> {
    let mut select =
        container::Entity::find_by_id(id).filter(container::Column::OwnerId.eq(owner_id));
    if for_update {
        select = select.lock(LockType::Update);
    }
    select
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Container not found".into()))
}

/// Fail with `NotFound` unless every id is a template of `owner_id`.
async fn ensure_templates_owned<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
    owner_id: i32,
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: HashSet<i32> = template::Entity::find()
        .filter(template::Column::Id.is_in(ids.to_vec()))
        .filter(template::Column::OwnerId.eq(owner_id))
        .select_only()
        .column(template::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::NotFound(format!("Template {missing} not found"))),
        None => Ok(()),
    }
}

/// Replace the stored order with `ids`, positions assigned by index.
async fn write_template_order<C: ConnectionTrait>(
    db: &C,
    container_id: i32,
    ids: &[i32],
) -> Result<(), AppError> {
    container_template::Entity::delete_many()
        .filter(container_template::Column::ContainerId.eq(container_id))
        .exec(db)
        .await?;

    if ids.is_empty() {
        return Ok(());
    }

    let rows = ids
        .iter()
        .enumerate()
        .map(|(position, &template_id)| container_template::ActiveModel {
            container_id: Set(container_id),
            template_id: Set(template_id),
            position: Set(position as i32),
        });
    container_template::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;

    Ok(())
}

async fn container_response<C: ConnectionTrait>(
    db: &C,
    model: container::Model,
) -> Result<ContainerResponse, AppError> {
    let positions: HashMap<i32, i32> = container_template::Entity::find()
        .filter(container_template::Column::ContainerId.eq(model.id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.template_id, row.position))
        .collect();

    let templates = ordered_templates(db, model.id)
        .await?
        .into_iter()
        .map(|t| ContainerTemplateItem {
            position: positions.get(&t.id).copied().unwrap_or_default(),
            template_id: t.id,
            name: t.name,
        })
        .collect();

    Ok(ContainerResponse {
        id: model.id,
        name: model.name,
        separator: model.separator,
        templates,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
