use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the composition engine.
///
/// `NotFound` and the precondition variants are caller errors and must not be
/// retried. `PushRequest` means local state was committed but the push could
/// not be queued. `VersionConflict` indicates a concurrency bug.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error(
        "Video {video_id} is already attached to container {container_id}; \
         a video can only be attached once (roll back or detach it first)"
    )]
    AlreadyAttached { video_id: i32, container_id: i32 },

    #[error("Video {video_id} is not attached to any container")]
    NotAttached { video_id: i32 },

    #[error("Concurrent history append for video {video_id} could not be serialized")]
    VersionConflict { video_id: i32 },

    #[error(
        "Version {version_number} of video {video_id} was recorded locally but the push \
         could not be queued: {message}"
    )]
    PushRequest {
        video_id: i32,
        version_number: i32,
        message: String,
    },

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl EngineError {
    pub fn not_found(what: &str, id: i32) -> Self {
        Self::NotFound(format!("{what} {id} not found"))
    }
}
