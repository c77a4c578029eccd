use serde::Deserialize;

/// Queue settings shared by the server and the worker.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether the queue is used at all. Default: true.
    /// When disabled the server still applies mutations but dispatches nothing.
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Recompute requests (server publishes and consumes). Default: "description_recompute".
    #[serde(default = "default_recompute_queue_name")]
    pub recompute_queue_name: String,
    /// Push jobs (server publishes, worker consumes). Default: "description_push".
    #[serde(default = "default_push_queue_name")]
    pub push_queue_name: String,
    /// Push results (worker publishes, server consumes). Default: "description_push_results".
    #[serde(default = "default_push_result_queue_name")]
    pub push_result_queue_name: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_recompute_queue_name() -> String {
    "description_recompute".into()
}
fn default_push_queue_name() -> String {
    "description_push".into()
}
fn default_push_result_queue_name() -> String {
    "description_push_results".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            recompute_queue_name: default_recompute_queue_name(),
            push_queue_name: default_push_queue_name(),
            push_result_queue_name: default_push_result_queue_name(),
        }
    }
}

/// Backoff settings for pushes to the video platform.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Retries after the first failed attempt. Default: 4.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Delay before the first retry. Default: 1000.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for any single delay. Default: 60000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u8 {
    4
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}
