use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{PushJob, PushOrigin, SyncStatus};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::engine::cascade::{CascadeSummary, on_variable_changed};
use crate::engine::ledger::{HistoryLedger, set_sync_status};
use crate::engine::link::ContainerLink;
use crate::engine::lookup::lock_video;
use crate::engine::recompute::render_video;
use crate::engine::rollback::{RollbackOutcome, rollback};
use crate::engine::{EngineError, attach};
use crate::entity::{variable, video};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::video::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "",
    tag = "Videos",
    operation_id = "listVideos",
    summary = "List videos with pagination and search",
    description = "Returns the caller's videos, most recently updated first. Videos are imported by the channel sync process.",
    params(VideoListQuery),
    responses(
        (status = 200, description = "List of videos", body = VideoListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_videos(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<VideoListQuery>,
) -> Result<Json<VideoListResponse>, AppError> {
    let (page, per_page) = crate::models::shared::page_params(query.page, query.per_page);

    let mut select = video::Entity::find().filter(video::Column::OwnerId.eq(auth_user.user_id));

    if let Some(container_id) = query.container_id {
        select = select.filter(video::Column::ContainerId.eq(container_id));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(video::Column::Title)))
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
        .order_by_desc(video::Column::UpdatedAt)
        .order_by_desc(video::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(VideoListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Videos",
    operation_id = "getVideo",
    summary = "Get a video by ID",
    description = "Returns the video with its current description, container and sync state.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video details", body = VideoResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<VideoResponse>, AppError> {
    let model = find_video(&state.db, id, auth_user.user_id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/attach",
    tag = "Videos",
    operation_id = "attachVideo",
    summary = "Attach a video to a container",
    description = "Puts the video under template control and seeds one empty variable per placeholder of the container. A video can be attached only while it is detached; moving it to another container requires a detach or rollback first. Nothing is pushed until a variable changes.",
    params(("id" = i32, Path, description = "Video ID")),
    request_body = AttachRequest,
    responses(
        (status = 200, description = "Video attached", body = AttachResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video or container not found (NOT_FOUND)", body = ErrorBody),
        (status = 412, description = "Video is already attached (PRECONDITION_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, container_id = payload.container_id))]
pub async fn attach_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AttachRequest>,
) -> Result<Json<AttachResponse>, AppError> {
    find_video(&state.db, id, auth_user.user_id).await?;

    let outcome = attach::attach(&state.db, id, payload.container_id).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/detach",
    tag = "Videos",
    operation_id = "detachVideo",
    summary = "Detach a video from its container",
    description = "Returns the video to manual control and deletes all of its variables. The current description is kept as is.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video detached", body = DetachResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
        (status = 412, description = "Video is not attached (PRECONDITION_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn detach_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DetachResponse>, AppError> {
    find_video(&state.db, id, auth_user.user_id).await?;

    let outcome = attach::detach(&state.db, id).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/variables",
    tag = "Variables",
    operation_id = "listVideoVariables",
    summary = "List a video's variables",
    description = "Returns the variables of an attached video ordered by template and name. A detached video has none.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Variables", body = VariableListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_video_variables(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<VariableListResponse>, AppError> {
    find_video(&state.db, id, auth_user.user_id).await?;
    let data = load_variables(&state.db, id).await?;
    Ok(Json(VariableListResponse { data }))
}

#[utoipa::path(
    patch,
    path = "/{id}/variables",
    tag = "Variables",
    operation_id = "updateVideoVariables",
    summary = "Update a video's variables",
    description = "Sets values and/or kinds of existing variables, keyed by template ID and name. If any value changed, a recompute of this video alone is queued. Kind changes never affect the description.",
    params(("id" = i32, Path, description = "Video ID")),
    request_body = UpdateVariablesRequest,
    responses(
        (status = 200, description = "Variables updated", body = UpdateVariablesResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video or variable not found (NOT_FOUND)", body = ErrorBody),
        (status = 412, description = "Video is not attached (PRECONDITION_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, count = payload.variables.len()))]
pub async fn update_video_variables(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateVariablesRequest>,
) -> Result<Json<UpdateVariablesResponse>, AppError> {
    validate_update_variables(&payload)?;

    let txn = state.db.begin().await?;

    let video = lock_video(&txn, id).await?;
    auth_user.require_owner(video.owner_id, "Video", id)?;
    let Some(container_id) = ContainerLink::of(&video).container_id() else {
        return Err(EngineError::NotAttached { video_id: id }.into());
    };

    let now = chrono::Utc::now();
    let mut value_changed = false;
    for update in payload.variables {
        let existing = variable::Entity::find_by_id((id, update.template_id, update.name.clone()))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Variable '{}' of template {} not found",
                    update.name, update.template_id
                ))
            })?;

        let mut active: variable::ActiveModel = existing.clone().into();
        if let Some(value) = update.value
            && value != existing.value
        {
            active.value = Set(value);
            value_changed = true;
        }
        if let Some(kind) = update.kind {
            active.kind = Set(kind.to_string());
        }
        if active.is_changed() {
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
    }

    txn.commit().await?;

    let cascade = if value_changed {
        on_variable_changed(state.dispatcher.as_ref(), id, container_id, &auth_user.username).await
    } else {
        CascadeSummary::default()
    };

    let data = load_variables(&state.db, id).await?;
    Ok(Json(UpdateVariablesResponse { data, cascade }))
}

#[utoipa::path(
    get,
    path = "/{id}/preview",
    tag = "Videos",
    operation_id = "previewVideo",
    summary = "Preview a video's description",
    description = "Renders the description from the container's templates and the video's stored variables, exactly as the push pipeline would. Variables without a value keep their `{{name}}` marker. For a detached video the stored description is returned.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Rendered description", body = VideoPreviewResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn preview_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<VideoPreviewResponse>, AppError> {
    let video = find_video(&state.db, id, auth_user.user_id).await?;

    let response = match render_video(&state.db, &video).await? {
        Some(description) => VideoPreviewResponse {
            changed: description != video.current_description,
            description,
            attached: true,
        },
        None => VideoPreviewResponse {
            description: video.current_description,
            attached: false,
            changed: false,
        },
    };
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/{id}/history",
    tag = "History",
    operation_id = "listVideoHistory",
    summary = "List a video's description history",
    description = "Returns every committed description of the video, newest first.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "History entries", body = HistoryListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_video_history(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<HistoryListResponse>, AppError> {
    find_video(&state.db, id, auth_user.user_id).await?;

    let data = HistoryLedger::new(&state.db)
        .list(id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(HistoryListResponse { data }))
}

#[utoipa::path(
    post,
    path = "/{id}/history/{history_id}/rollback",
    tag = "History",
    operation_id = "rollbackVideo",
    summary = "Roll a video back to a historical description",
    description = "Restores the text of the history entry verbatim, detaches the video from its container, deletes its variables and records the restored text as a new history entry, then queues a push. If the push cannot be queued the local changes stay committed and 502 PUSH_DISPATCH_FAILED is returned; retry with `POST /videos/{id}/sync`.",
    params(
        ("id" = i32, Path, description = "Video ID"),
        ("history_id" = i32, Path, description = "History entry ID"),
    ),
    responses(
        (status = 200, description = "Rolled back", body = RollbackOutcome),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video or history entry not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Recorded locally but the push was not queued (PUSH_DISPATCH_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, history_id))]
pub async fn rollback_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, history_id)): Path<(i32, i32)>,
) -> Result<Json<RollbackOutcome>, AppError> {
    let outcome = rollback(
        &state.db,
        state.dispatcher.as_ref(),
        auth_user.user_id,
        id,
        history_id,
        &auth_user.username,
    )
    .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/{id}/sync",
    tag = "Videos",
    operation_id = "syncVideo",
    summary = "Push a video's description again",
    description = "For an attached video, queues a recompute (pushed if it differs or the last push failed). For a detached video, queues a push of the stored description. Use after a failed push or a 502 from rollback.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 202, description = "Sync queued", body = SyncResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Push pipeline unavailable (PUSH_DISPATCH_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn sync_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let video = lock_video(&txn, id).await?;
    auth_user.require_owner(video.owner_id, "Video", id)?;

    let mode = match ContainerLink::of(&video) {
        ContainerLink::Assigned(_) => {
            txn.commit().await?;
            state
                .dispatcher
                .request_recompute(&[id], &auth_user.username)
                .await?;
            "recompute"
        }
        ContainerLink::Unassigned => {
            set_sync_status(&txn, id, SyncStatus::Pending, None).await?;
            txn.commit().await?;

            let job = PushJob::new(
                id,
                video.external_id,
                video.current_description,
                auth_user.username.as_str(),
                PushOrigin::Restore,
            );
            state.dispatcher.request_push(job).await?;
            "restore"
        }
    };

    info!(video_id = id, mode, "Queued manual sync");
    Ok((StatusCode::ACCEPTED, Json(SyncResponse { video_id: id, mode })))
}

async fn find_video<C: ConnectionTrait>(
    db: &C,
    id: i32,
    owner_id: i32,
) -> Result<video::Model, AppError> {
    video::Entity::find_by_id(id)
        .filter(video::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {id} not found")))
}

async fn load_variables<C: ConnectionTrait>(
    db: &C,
    video_id: i32,
) -> Result<Vec<VariableResponse>, AppError> {
    let rows = variable::Entity::find()
        .filter(variable::Column::VideoId.eq(video_id))
        .order_by_asc(variable::Column::TemplateId)
        .order_by_asc(variable::Column::Name)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
