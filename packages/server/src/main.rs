use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vidscribe_server::config::AppConfig;
use vidscribe_server::consumers::{consume_push_results, consume_recompute_jobs};
use vidscribe_server::dispatch::{DescriptionDispatcher, DisabledDispatcher, QueueDispatcher};
use vidscribe_server::state::AppState;
use vidscribe_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;

    let dispatcher: Arc<dyn DescriptionDispatcher> = if config.mq.enabled {
        let mq = Arc::new(
            mq::init_mq((&config.mq).into())
                .await
                .context("Failed to initialize MQ")?,
        );
        info!(
            recompute_queue = %config.mq.recompute_queue_name,
            push_queue = %config.mq.push_queue_name,
            push_result_queue = %config.mq.push_result_queue_name,
            "MQ connected"
        );

        let dispatcher: Arc<dyn DescriptionDispatcher> =
            Arc::new(QueueDispatcher::new(Arc::clone(&mq), config.mq.clone()));

        tokio::spawn(consume_recompute_jobs(
            db.clone(),
            Arc::clone(&mq),
            Arc::clone(&dispatcher),
            config.mq.recompute_queue_name.clone(),
        ));
        tokio::spawn(consume_push_results(
            db.clone(),
            Arc::clone(&mq),
            config.mq.push_result_queue_name.clone(),
        ));

        dispatcher
    } else {
        warn!("MQ disabled, description changes will not be pushed");
        Arc::new(DisabledDispatcher)
    };

    let cors = cors_layer(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        config,
        dispatcher,
    };

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let origins = config
        .server
        .cors
        .allow_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(config.server.cors.max_age)))
}
