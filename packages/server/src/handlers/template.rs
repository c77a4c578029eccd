use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::{info, instrument};

use crate::engine::cascade::{dispatch_recompute, prepare_template_cascade};
use crate::engine::impact::{Impact, template_edit_affects_output};
use crate::entity::{container_template, template};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::template::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "",
    tag = "Templates",
    operation_id = "createTemplate",
    summary = "Create a template",
    description = "Creates a reusable text template. Placeholders are written as `{{name}}`; the variable list is derived from the content.",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_template(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_template(&payload)?;

    let now = chrono::Utc::now();
    let new_template = template::ActiveModel {
        owner_id: Set(auth_user.user_id),
        name: Set(payload.name.trim().to_string()),
        content: Set(payload.content),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_template.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(TemplateResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "",
    tag = "Templates",
    operation_id = "listTemplates",
    summary = "List templates with pagination and search",
    description = "Returns the caller's templates, newest first. Content is omitted from list results.",
    params(TemplateListQuery),
    responses(
        (status = 200, description = "List of templates", body = TemplateListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_templates(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<TemplateListResponse>, AppError> {
    let (page, per_page) = crate::models::shared::page_params(query.page, query.per_page);

    let mut select =
        template::Entity::find().filter(template::Column::OwnerId.eq(auth_user.user_id));

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(template::Column::Name)))
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
        .order_by_desc(template::Column::CreatedAt)
        .order_by_desc(template::Column::Id)
        .select_only()
        .column(template::Column::Id)
        .column(template::Column::Name)
        .column(template::Column::CreatedAt)
        .column(template::Column::UpdatedAt)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .into_model::<TemplateListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(TemplateListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Templates",
    operation_id = "getTemplate",
    summary = "Get a template by ID",
    description = "Returns the template with its content and derived variable names.",
    params(("id" = i32, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template details", body = TemplateResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_template(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TemplateResponse>, AppError> {
    let model = find_template(&state.db, id, auth_user.user_id, false).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Templates",
    operation_id = "updateTemplate",
    summary = "Update a template",
    description = "Partially updates a template. A content change re-synchronizes the variables of every video attached to a container that uses the template and queues a recompute for them. A rename affects no video.",
    params(("id" = i32, Path, description = "Template ID")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = TemplateUpdateResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_template(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTemplateRequest>,
) -> Result<Json<TemplateUpdateResponse>, AppError> {
    validate_update_template(&payload)?;

    if payload == UpdateTemplateRequest::default() {
        let existing = find_template(&state.db, id, auth_user.user_id, false).await?;
        return Ok(Json(TemplateUpdateResponse {
            template: existing.into(),
            cascade: Default::default(),
        }));
    }

    let txn = state.db.begin().await?;

    let existing = find_template(&txn, id, auth_user.user_id, true).await?;
    let content_changed =
        template_edit_affects_output(&existing.content, payload.content.as_deref());

    let mut active: template::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;

    let impact = if content_changed {
        prepare_template_cascade(&txn, id).await?
    } else {
        Impact::none()
    };

    txn.commit().await?;

    let cascade = dispatch_recompute(state.dispatcher.as_ref(), impact, &auth_user.username).await;
    if content_changed {
        info!(
            template_id = id,
            videos = cascade.video_ids.len(),
            dispatched = cascade.dispatched,
            "Template content changed"
        );
    }

    Ok(Json(TemplateUpdateResponse {
        template: model.into(),
        cascade,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Templates",
    operation_id = "deleteTemplate",
    summary = "Delete a template",
    description = "Permanently deletes a template. Returns 409 CONFLICT while any container uses it.",
    params(("id" = i32, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Template is used by a container (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_template(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let _template = find_template(&txn, id, auth_user.user_id, true).await?;

    let usage = container_template::Entity::find()
        .filter(container_template::Column::TemplateId.eq(id))
        .count(&txn)
        .await?;
    if usage > 0 {
        return Err(AppError::Conflict(format!(
            "Cannot delete template used by {usage} container(s)"
        )));
    }

    template::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_template<C: ConnectionTrait>(
    db: &C,
    id: i32,
    owner_id: i32,
    for_update: bool,
) -> Result<template::Model, AppError> {
    let mut select = template::Entity::find_by_id(id).filter(template::Column::OwnerId.eq(owner_id));
    if for_update {
        select = select.lock(LockType::Update);
    }
    select
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".into()))
}
