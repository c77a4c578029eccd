use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{MqAppConfig, RetryConfig};

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Push jobs handled concurrently. Default: 4.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_batch_size() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            batch_size: default_batch_size(),
        }
    }
}

/// Video platform API settings.
#[derive(Debug, Deserialize, Clone)]
pub struct PlatformConfig {
    /// Base URL of the YouTube Data API. Default: "https://www.googleapis.com/youtube/v3".
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// OAuth access token with the `youtube.force-ssl` scope.
    #[serde(default)]
    pub access_token: String,
    /// Per-request timeout. Default: 30.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            access_token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("VIDSCRIBE_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.batch_size", 4_i64)?
            .set_default("platform.api_base", default_api_base())?
            .set_default("platform.timeout_secs", 30_i64)?
            .set_default("retry.max_retries", 4_i64)?
            .set_default("retry.base_delay_ms", 1000_i64)?
            .set_default("retry.max_delay_ms", 60_000_i64)?
            .set_default("mq.enabled", true)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.push_queue_name", "description_push")?
            .set_default("mq.push_result_queue_name", "description_push_results")?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., VIDSCRIBE__PLATFORM__ACCESS_TOKEN)
            .add_source(Environment::with_prefix("VIDSCRIBE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
