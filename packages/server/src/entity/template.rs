use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "template")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub owner_id: i32,

    pub name: String,
    /// Raw text with `{{name}}` placeholders. Variable names are derived from
    /// it on demand and never stored.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(has_many, via = "container_template")]
    pub containers: HasMany<super::container::Entity>,

    #[sea_orm(has_many)]
    pub variables: HasMany<super::variable::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
