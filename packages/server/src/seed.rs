use sea_orm::*;
use sea_query::{Index, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{container_template, description_history, video};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes, so we create them
/// manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Gapless per-video version numbers; the ledger relies on this to reject
    // a concurrent duplicate append.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_history_video_version")
        .table(description_history::Entity)
        .col(description_history::Column::VideoId)
        .col(description_history::Column::VersionNumber)
        .to_string(PostgresQueryBuilder);

    // Unlike the lookup indexes below, this one is required for correctness.
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index idx_history_video_version exists");

    // Segment order of a container:
    // SELECT ... FROM container_template WHERE container_id = ? ORDER BY position
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_container_template_position")
        .table(container_template::Entity)
        .col(container_template::Column::ContainerId)
        .col(container_template::Column::Position)
        .to_string(PostgresQueryBuilder);
    create_lookup_index(db, "idx_container_template_position", &stmt).await;

    // Impact of a template change: containers using a template.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_container_template_template")
        .table(container_template::Entity)
        .col(container_template::Column::TemplateId)
        .to_string(PostgresQueryBuilder);
    create_lookup_index(db, "idx_container_template_template", &stmt).await;

    // Video listing: SELECT ... WHERE owner_id = ? ORDER BY updated_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_video_owner_updated")
        .table(video::Entity)
        .col(video::Column::OwnerId)
        .col(video::Column::UpdatedAt)
        .to_string(PostgresQueryBuilder);
    create_lookup_index(db, "idx_video_owner_updated", &stmt).await;

    Ok(())
}

async fn create_lookup_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => {
            info!("Ensured index {} exists", name);
        }
        Err(e) => {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }
}
