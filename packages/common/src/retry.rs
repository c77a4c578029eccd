use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RetryConfig;

/// A failed attempt, kept for logging and for the final failure report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt: u8,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl RetryAttempt {
    pub fn new(attempt: u8, error: impl Into<String>) -> Self {
        Self {
            attempt,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then try again.
    Retry { delay: Duration },
    /// Give up; every attempt has failed.
    GiveUp,
}

/// Records failures of one operation and decides whether to try again.
#[derive(Debug)]
pub struct RetryState<'a> {
    config: &'a RetryConfig,
    history: Vec<RetryAttempt>,
}

impl<'a> RetryState<'a> {
    pub fn new(config: &'a RetryConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
        }
    }

    /// Record a failed attempt and decide what comes next.
    pub fn record_failure(&mut self, error: impl Into<String>) -> RetryDecision {
        let attempt = self.attempts().saturating_add(1);
        self.history.push(RetryAttempt::new(attempt, error));

        if attempt <= self.config.max_retries {
            RetryDecision::Retry {
                delay: calculate_backoff(
                    attempt,
                    self.config.base_delay_ms,
                    self.config.max_delay_ms,
                ),
            }
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Number of failed attempts so far.
    pub fn attempts(&self) -> u8 {
        self.history.len().min(u8::MAX as usize) as u8
    }

    pub fn history(&self) -> &[RetryAttempt] {
        &self.history
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow((attempt - 1) as u32));
    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}
