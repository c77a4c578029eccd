use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of a committed description.
///
/// `(video_id, version_number)` is unique; see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "description_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub video_id: i32,
    #[sea_orm(belongs_to, from = "video_id", to = "id")]
    pub video: HasOne<super::video::Entity>,

    /// 1-based, gapless per video.
    pub version_number: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub actor: String,

    /// Push job that produced this entry. NULL for entries written by rollback.
    #[sea_orm(unique)]
    pub push_job_id: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
