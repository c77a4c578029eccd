use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/templates", template_routes())
        .nest("/containers", container_routes())
        .nest("/videos", video_routes())
        .nest("/render", render_routes())
}

fn template_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::template::list_templates,
            handlers::template::create_template
        ))
        .routes(routes!(
            handlers::template::get_template,
            handlers::template::update_template,
            handlers::template::delete_template
        ))
}

fn container_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::container::list_containers,
            handlers::container::create_container
        ))
        .routes(routes!(
            handlers::container::get_container,
            handlers::container::update_container,
            handlers::container::delete_container
        ))
        .routes(routes!(handlers::container::replace_container_templates))
        .routes(routes!(handlers::container::list_container_variables))
        .routes(routes!(handlers::container::preview_container))
}

fn video_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::video::list_videos))
        .routes(routes!(handlers::video::get_video))
        .routes(routes!(handlers::video::attach_video))
        .routes(routes!(handlers::video::detach_video))
        .routes(routes!(
            handlers::video::list_video_variables,
            handlers::video::update_video_variables
        ))
        .routes(routes!(handlers::video::preview_video))
        .routes(routes!(handlers::video::list_video_history))
        .routes(routes!(handlers::video::rollback_video))
        .routes(routes!(handlers::video::sync_video))
}

fn render_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::render::extract))
        .routes(routes!(handlers::render::preview))
}
