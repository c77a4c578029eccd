use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::engine::cascade::CascadeSummary;
use crate::error::AppError;

pub use super::shared::{Pagination, escape_like};
use super::shared::{validate_name, validate_ordered_ids};

/// Upper bound on templates in one container.
pub const MAX_CONTAINER_TEMPLATES: usize = 100;

fn default_separator() -> String {
    "\n\n".to_string()
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContainerRequest {
    #[schema(example = "Gaming videos")]
    pub name: String,
    /// Inserted between rendered templates. Defaults to a blank line.
    #[serde(default = "default_separator")]
    #[schema(example = "\n\n")]
    pub separator: String,
    /// Template ids in segment order.
    #[serde(default)]
    #[schema(example = json!([3, 1]))]
    pub template_ids: Vec<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateContainerRequest {
    pub name: Option<String>,
    pub separator: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReplaceTemplatesRequest {
    /// Template ids in segment order. Positions are assigned 0, 1, 2, ... by array index.
    #[schema(example = json!([1, 3]))]
    pub template_ids: Vec<i32>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ContainerListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive substring match on the name.
    pub search: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerTemplateItem {
    #[schema(example = 3)]
    pub template_id: i32,
    #[schema(example = "Sponsor block")]
    pub name: String,
    #[schema(example = 0)]
    pub position: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerResponse {
    pub id: i32,
    pub name: String,
    pub separator: String,
    /// Templates in segment order.
    pub templates: Vec<ContainerTemplateItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct ContainerListItem {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerListResponse {
    pub data: Vec<ContainerListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerUpdateResponse {
    pub container: ContainerResponse,
    /// Videos queued for recompute. Empty for renames.
    pub cascade: CascadeSummary,
}

/// A placeholder a video attached to the container must supply.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerVariable {
    pub template_id: i32,
    pub template_name: String,
    #[schema(example = "coupon")]
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerVariablesResponse {
    pub data: Vec<ContainerVariable>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ContainerPreviewRequest {
    /// Values by placeholder name, shared by every template.
    #[serde(default)]
    #[schema(example = json!({"coupon": "SAVE10"}))]
    pub values: HashMap<String, String>,
}

pub fn validate_create_container(req: &CreateContainerRequest) -> Result<(), AppError> {
    validate_name(&req.name)?;
    validate_ordered_ids(&req.template_ids, "template", MAX_CONTAINER_TEMPLATES)
}

pub fn validate_update_container(req: &UpdateContainerRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    Ok(())
}

pub fn validate_replace_templates(req: &ReplaceTemplatesRequest) -> Result<(), AppError> {
    validate_ordered_ids(&req.template_ids, "template", MAX_CONTAINER_TEMPLATES)
}
