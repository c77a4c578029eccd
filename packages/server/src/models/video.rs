use chrono::{DateTime, Utc};
use common::{SyncStatus, VariableKind};
use serde::{Deserialize, Serialize};

use crate::engine::attach::{AttachOutcome, DetachOutcome};
use crate::engine::cascade::CascadeSummary;
use crate::entity::{description_history, variable, video};
use crate::error::AppError;

pub use super::shared::{Pagination, escape_like};

/// Upper bound on variables changed by one request.
pub const MAX_VARIABLE_UPDATES: usize = 200;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct VideoListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    /// Only videos attached to this container.
    pub container_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoResponse {
    #[schema(example = 4)]
    pub id: i32,
    #[schema(example = "UC_x5XG1OV2P6uZZ5FSM9Ttw")]
    pub channel_id: String,
    #[schema(example = "dQw4w9WgXcQ")]
    pub external_id: String,
    pub title: String,
    pub current_description: String,
    /// Null while the description is under manual control.
    pub container_id: Option<i32>,
    pub sync_status: SyncStatus,
    pub last_push_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoListItem {
    pub id: i32,
    pub external_id: String,
    pub title: String,
    pub container_id: Option<i32>,
    pub sync_status: SyncStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoListResponse {
    pub data: Vec<VideoListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AttachRequest {
    #[schema(example = 2)]
    pub container_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttachResponse {
    pub video_id: i32,
    pub container_id: i32,
    /// Empty variable rows created for the container's placeholders.
    pub variables_seeded: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DetachResponse {
    pub video_id: i32,
    /// Container the video was attached to.
    pub container_id: i32,
    pub variables_cleared: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VariableResponse {
    pub template_id: i32,
    #[schema(example = "coupon")]
    pub name: String,
    #[schema(example = "SAVE10")]
    pub value: String,
    #[schema(example = "text")]
    pub kind: String,
    /// False while the value is empty; the `{{name}}` marker then stays in
    /// the rendered description.
    pub resolved: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VariableListResponse {
    pub data: Vec<VariableResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct VariableUpdate {
    pub template_id: i32,
    #[schema(example = "coupon")]
    pub name: String,
    #[schema(example = "SAVE10")]
    pub value: Option<String>,
    /// Input hint. Any string is accepted; it never affects rendering.
    #[schema(value_type = Option<String>, example = "text")]
    pub kind: Option<VariableKind>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateVariablesRequest {
    pub variables: Vec<VariableUpdate>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UpdateVariablesResponse {
    /// All variables of the video after the update.
    pub data: Vec<VariableResponse>,
    /// Empty unless a value changed.
    pub cascade: CascadeSummary,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoPreviewResponse {
    /// What the description would be if recomputed now, or the stored
    /// description for a detached video.
    pub description: String,
    pub attached: bool,
    /// Whether `description` differs from `current_description`.
    pub changed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HistoryEntryResponse {
    pub id: i32,
    #[schema(example = 3)]
    pub version_number: i32,
    pub description: String,
    #[schema(example = "alice_wonder")]
    pub actor: String,
    pub push_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HistoryListResponse {
    /// Newest first.
    pub data: Vec<HistoryEntryResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SyncResponse {
    pub video_id: i32,
    /// `recompute` for attached videos, `restore` for detached ones.
    #[schema(example = "recompute")]
    pub mode: &'static str,
}

impl From<video::Model> for VideoResponse {
    fn from(m: video::Model) -> Self {
        Self {
            id: m.id,
            channel_id: m.channel_id,
            external_id: m.external_id,
            title: m.title,
            current_description: m.current_description,
            container_id: m.container_id,
            sync_status: m.sync_status,
            last_push_error: m.last_push_error,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<video::Model> for VideoListItem {
    fn from(m: video::Model) -> Self {
        Self {
            id: m.id,
            external_id: m.external_id,
            title: m.title,
            container_id: m.container_id,
            sync_status: m.sync_status,
            updated_at: m.updated_at,
        }
    }
}

impl From<variable::Model> for VariableResponse {
    fn from(m: variable::Model) -> Self {
        Self {
            template_id: m.template_id,
            name: m.name,
            resolved: !m.value.is_empty(),
            value: m.value,
            kind: m.kind,
            updated_at: m.updated_at,
        }
    }
}

impl From<description_history::Model> for HistoryEntryResponse {
    fn from(m: description_history::Model) -> Self {
        Self {
            id: m.id,
            version_number: m.version_number,
            description: m.description,
            actor: m.actor,
            push_job_id: m.push_job_id,
            created_at: m.created_at,
        }
    }
}

impl From<AttachOutcome> for AttachResponse {
    fn from(o: AttachOutcome) -> Self {
        Self {
            video_id: o.video_id,
            container_id: o.container_id,
            variables_seeded: o.variables_seeded,
        }
    }
}

impl From<DetachOutcome> for DetachResponse {
    fn from(o: DetachOutcome) -> Self {
        Self {
            video_id: o.video_id,
            container_id: o.container_id,
            variables_cleared: o.variables_cleared,
        }
    }
}

pub fn validate_update_variables(req: &UpdateVariablesRequest) -> Result<(), AppError> {
    if req.variables.is_empty() {
        return Err(AppError::Validation("variables must not be empty".into()));
    }
    if req.variables.len() > MAX_VARIABLE_UPDATES {
        return Err(AppError::Validation(format!(
            "Too many variables: max {MAX_VARIABLE_UPDATES}"
        )));
    }
    for update in &req.variables {
        if update.value.is_none() && update.kind.is_none() {
            return Err(AppError::Validation(format!(
                "Variable '{}' needs a value or a kind",
                update.name
            )));
        }
    }
    Ok(())
}
