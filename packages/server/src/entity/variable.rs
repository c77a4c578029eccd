use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-video value of one placeholder in one template.
///
/// The composite primary key is the uniqueness guarantee: one row per
/// (video, template, name).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variable")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub video_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    #[sea_orm(belongs_to, from = "video_id", to = "id")]
    pub video: HasOne<super::video::Entity>,
    #[sea_orm(belongs_to, from = "template_id", to = "id")]
    pub template: HasOne<super::template::Entity>,

    /// Empty until the user supplies a value.
    #[sea_orm(column_type = "Text")]
    pub value: String,
    /// Input hint (`text`, `number`, `date`, `url`, ...). Never affects rendering.
    pub kind: String,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
