use std::sync::Arc;

use anyhow::Context;
use common::{PushJob, RetryConfig};
use mq::{BroccoliError, BrokerMessage, Mq, init_mq};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vidscribe_worker::{VideoPlatform, WorkerAppConfig, YoutubeClient, execute_push};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    if config.platform.access_token.is_empty() {
        warn!("No platform access token configured; every push will be rejected");
    }

    let platform: Arc<dyn VideoPlatform> = Arc::new(
        YoutubeClient::new(&config.platform).context("Failed to build platform client")?,
    );

    let mq = Arc::new(
        init_mq((&config.mq).into())
            .await
            .context("Failed to initialize MQ")?,
    );

    info!(
        push_queue = %config.mq.push_queue_name,
        result_queue = %config.mq.push_result_queue_name,
        max_retries = config.retry.max_retries,
        "MQ connected"
    );

    let result_queue = config.mq.push_result_queue_name.clone();
    let retry = config.retry.clone();
    let mq_for_handler = Arc::clone(&mq);

    let result = mq
        .process_messages(
            &config.mq.push_queue_name,
            Some(config.worker.batch_size), // concurrent pushes
            None,
            move |message: BrokerMessage<PushJob>| {
                let mq = Arc::clone(&mq_for_handler);
                let platform = Arc::clone(&platform);
                let result_queue = result_queue.clone();
                let retry = retry.clone();
                async move {
                    process_job(message.payload, &mq, platform.as_ref(), &retry, &result_queue)
                        .await
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}

async fn process_job(
    job: PushJob,
    mq: &Mq,
    platform: &dyn VideoPlatform,
    retry: &RetryConfig,
    result_queue: &str,
) -> Result<(), BroccoliError> {
    info!(
        video_id = job.video_id,
        job_id = %job.job_id,
        origin = ?job.origin,
        "Processing push job"
    );

    let result = execute_push(&job, platform, retry).await;

    mq::publish(mq, result_queue, &result)
        .await
        .map_err(|e| BroccoliError::Publish(format!("Failed to publish PushResult: {e}")))?;

    info!(
        video_id = result.video_id,
        job_id = %result.job_id,
        success = result.is_success(),
        "Published push result"
    );

    Ok(())
}
