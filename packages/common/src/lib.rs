pub mod config;
pub mod jobs;
pub mod placeholder;
pub mod render;
pub mod retry;
pub mod sync_status;
pub mod variable_kind;

pub use config::{MqAppConfig, RetryConfig};
pub use jobs::{PushJob, PushOrigin, PushOutcome, PushResult, RecomputeJob};
pub use placeholder::extract_variables;
pub use render::{Segment, build_description, build_scoped, render_template};
pub use sync_status::SyncStatus;
pub use variable_kind::VariableKind;
