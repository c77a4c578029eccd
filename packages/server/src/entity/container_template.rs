use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One slot of a container's ordered template list.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "container_template")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub container_id: i32,
    #[sea_orm(primary_key)]
    pub template_id: i32,
    #[sea_orm(belongs_to, from = "container_id", to = "id")]
    pub container: HasOne<super::container::Entity>,
    #[sea_orm(belongs_to, from = "template_id", to = "id")]
    pub template: HasOne<super::template::Entity>,

    /// 0-based segment index within the container.
    #[sea_orm(default_value = 0)]
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
