use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to publish to '{queue}': {message}")]
    Publish { queue: String, message: String },

    /// A batch publish stopped after `published` of `total` messages; the
    /// published ones stay queued.
    #[error("Published {published} of {total} messages to '{queue}': {message}")]
    PartialBatch {
        queue: String,
        published: usize,
        total: usize,
        message: String,
    },
}

impl MqError {
    /// Messages that reached the queue before the failure.
    pub fn published(&self) -> usize {
        match self {
            Self::PartialBatch { published, .. } => *published,
            Self::Connection(_) | Self::Publish { .. } => 0,
        }
    }
}
