use common::SyncStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub owner_id: i32,

    /// Channel the video was imported from.
    pub channel_id: String,
    /// Video id on the platform.
    #[sea_orm(unique)]
    pub external_id: String,
    pub title: String,

    /// Latest materialized description. The history ledger is authoritative.
    #[sea_orm(column_type = "Text")]
    pub current_description: String,

    /// NULL while the video is under manual control. Only ever written
    /// through `engine::link`.
    #[sea_orm(indexed)]
    pub container_id: Option<i32>,
    #[sea_orm(belongs_to, from = "container_id", to = "id")]
    pub container: HasOne<super::container::Entity>,

    pub sync_status: SyncStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_push_error: Option<String>,

    #[sea_orm(has_many)]
    pub variables: HasMany<super::variable::Entity>,

    #[sea_orm(has_many)]
    pub history: HasMany<super::description_history::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
