use axum::Json;
use common::{build_description, extract_variables};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::render::*;

#[utoipa::path(
    post,
    path = "/variables",
    tag = "Render",
    operation_id = "extractVariables",
    summary = "Extract placeholder names from text",
    description = "Returns the distinct `{{name}}` placeholders of the text in first-occurrence order. Names are trimmed; empty or malformed markers are ignored.",
    request_body = ExtractVariablesRequest,
    responses(
        (status = 200, description = "Placeholder names", body = ExtractVariablesResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, payload))]
pub async fn extract(
    _auth_user: AuthUser,
    AppJson(payload): AppJson<ExtractVariablesRequest>,
) -> Result<Json<ExtractVariablesResponse>, AppError> {
    Ok(Json(ExtractVariablesResponse {
        variables: extract_variables(&payload.content),
    }))
}

#[utoipa::path(
    post,
    path = "/preview",
    tag = "Render",
    operation_id = "renderPreview",
    summary = "Render ad-hoc templates",
    description = "Substitutes the values into each template and joins the results with the separator. This is the same function the push pipeline uses, so a preview always matches what would be pushed.",
    request_body = RenderPreviewRequest,
    responses(
        (status = 200, description = "Rendered description", body = PreviewResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, payload), fields(templates = payload.templates.len()))]
pub async fn preview(
    _auth_user: AuthUser,
    AppJson(payload): AppJson<RenderPreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    Ok(Json(PreviewResponse {
        description: build_description(&payload.templates, &payload.values, &payload.separator),
    }))
}
