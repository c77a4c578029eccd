pub use broccoli_queue::{
    brokers::broker::BrokerMessage, error::BroccoliError, queue::BroccoliQueue,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::config::MqConfig;
use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(|e| MqError::Connection(e.to_string()))
}

/// Publish one message and map the broker error to [`MqError`].
pub async fn publish<T>(mq: &MqQueue, queue: &str, message: &T) -> Result<(), MqError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    mq.publish(queue, None, message, None)
        .await
        .map_err(|e| MqError::Publish {
            queue: queue.to_string(),
            message: e.to_string(),
        })?;
    debug!(queue, "Published message");
    Ok(())
}

/// Publish a batch of messages to the same queue in order, stopping at the
/// first failure.
///
/// A failure after some messages went out is reported as
/// [`MqError::PartialBatch`]; publishes are not rolled back.
pub async fn publish_all<T>(mq: &MqQueue, queue: &str, messages: &[T]) -> Result<(), MqError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    for (published, message) in messages.iter().enumerate() {
        if let Err(e) = publish(mq, queue, message).await {
            return Err(partial_batch(e, queue, published, messages.len()));
        }
    }
    Ok(())
}

fn partial_batch(err: MqError, queue: &str, published: usize, total: usize) -> MqError {
    if published == 0 {
        return err;
    }
    let message = match err {
        MqError::Publish { message, .. } => message,
        other => other.to_string(),
    };
    MqError::PartialBatch {
        queue: queue.to_string(),
        published,
        total,
        message,
    }
}
