pub mod config;
pub mod error;
pub mod platform;
pub mod push;

pub use config::WorkerAppConfig;
pub use error::PlatformError;
pub use platform::{VideoPlatform, YoutubeClient};
pub use push::execute_push;
