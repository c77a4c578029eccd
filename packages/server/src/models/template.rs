use chrono::{DateTime, Utc};
use common::extract_variables;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::engine::cascade::CascadeSummary;
use crate::entity::template;
use crate::error::AppError;

pub use super::shared::{Pagination, escape_like};
use super::shared::validate_name;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTemplateRequest {
    #[schema(example = "Sponsor block")]
    pub name: String,
    /// Raw text with `{{name}}` placeholders.
    #[schema(example = "Use code {{coupon}} for {{discount}} off")]
    pub content: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TemplateListQuery {
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
pub struct TemplateResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Sponsor block")]
    pub name: String,
    pub content: String,
    /// Placeholder names in first-occurrence order, derived from `content`.
    #[schema(example = json!(["coupon", "discount"]))]
    pub variables: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct TemplateListItem {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TemplateListResponse {
    pub data: Vec<TemplateListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TemplateUpdateResponse {
    pub template: TemplateResponse,
    /// Videos queued for recompute. Empty unless the content changed.
    pub cascade: CascadeSummary,
}

impl From<template::Model> for TemplateResponse {
    fn from(m: template::Model) -> Self {
        Self {
            id: m.id,
            variables: extract_variables(&m.content),
            name: m.name,
            content: m.content,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_template(req: &CreateTemplateRequest) -> Result<(), AppError> {
    validate_name(&req.name)
}

pub fn validate_update_template(req: &UpdateTemplateRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    Ok(())
}
