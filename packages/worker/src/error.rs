use thiserror::Error;

/// Failures talking to the video platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Platform returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Video {0} not found on the platform")]
    VideoNotFound(String),

    #[error("Unexpected platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Transport errors, rate limiting and server errors may succeed on a
    /// later attempt. Everything else fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Http(e) => !e.is_builder() && !e.is_decode(),
            PlatformError::Status { status, .. } => *status == 429 || *status >= 500,
            PlatformError::VideoNotFound(_) | PlatformError::InvalidResponse(_) => false,
        }
    }
}
