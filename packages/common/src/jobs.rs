//! Queue payloads exchanged between the server and the push worker.
//!
//! Flow: the server publishes a [`RecomputeJob`] per affected video and
//! consumes it itself; when the freshly rendered description differs from the
//! stored one it publishes a [`PushJob`] for the worker, which answers with a
//! [`PushResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to re-render one video's description from its current inputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecomputeJob {
    /// Job identifier (UUID)
    pub job_id: String,
    pub video_id: i32,
    /// Who caused the recompute (recorded on the resulting history entry)
    pub actor: String,
    pub requested_at: DateTime<Utc>,
}

impl RecomputeJob {
    pub fn new(video_id: i32, actor: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            video_id,
            actor: actor.into(),
            requested_at: Utc::now(),
        }
    }
}

/// Why a description is being pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOrigin {
    /// Rendered from templates and variables; history is appended once the
    /// platform confirms the update.
    Recompute,
    /// Text restored verbatim (rollback or manual re-sync); history was
    /// already recorded before the push was requested.
    Restore,
}

impl PushOrigin {
    /// Whether a successful push of this origin must append a history entry.
    pub fn records_history(&self) -> bool {
        matches!(self, Self::Recompute)
    }
}

/// A description to write to the video platform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushJob {
    /// Job identifier (UUID)
    pub job_id: String,
    pub video_id: i32,
    /// Platform-side identifier of the video
    pub external_id: String,
    pub description: String,
    pub actor: String,
    pub origin: PushOrigin,
}

impl PushJob {
    pub fn new(
        video_id: i32,
        external_id: impl Into<String>,
        description: impl Into<String>,
        actor: impl Into<String>,
        origin: PushOrigin,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            video_id,
            external_id: external_id.into(),
            description: description.into(),
            actor: actor.into(),
            origin,
        }
    }
}

/// Outcome of a push attempt sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed,
    Failed { error: String, attempts: u8 },
}

/// Result published by the worker after handling a [`PushJob`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushResult {
    pub job_id: String,
    pub video_id: i32,
    pub description: String,
    pub actor: String,
    pub origin: PushOrigin,
    pub outcome: PushOutcome,
    pub finished_at: DateTime<Utc>,
}

impl PushResult {
    pub fn from_job(job: &PushJob, outcome: PushOutcome) -> Self {
        Self {
            job_id: job.job_id.clone(),
            video_id: job.video_id,
            description: job.description.clone(),
            actor: job.actor.clone(),
            origin: job.origin,
            outcome,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PushOutcome::Pushed)
    }
}
