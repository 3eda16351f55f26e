//! Bounded retry with exponential backoff for transport failures and
//! retryable statuses.
//!
//! This layer is reactive only. Proactive admission control lives in
//! [`crate::throttling`], and the registry client composes both.

use std::time::Duration;

use serde::Deserialize;

use crate::http_client::HttpError;

/// Exponential backoff: retry `n` (0-based) waits `base * factor^n`, capped
/// at `max`. With `jitter` the wait is spread uniformly over +/- 50%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl Backoff {
    pub fn delay(self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = (self.base.as_secs_f64() * self.factor.powi(exponent))
            .min(self.max.as_secs_f64());
        let capped = Duration::from_secs_f64(seconds);
        if !self.jitter {
            return capped;
        }

        let spread_ms = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX);
        let low = spread_ms / 2;
        Duration::from_millis(fastrand::u64(low..=spread_ms.saturating_add(low)))
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// HTTP status codes that trigger a retry before the response is classified.
    pub retry_on_status: Vec<u16>,
    /// Whether retryable transport errors (connect, timeout, reset) are retried.
    pub retry_on_transport: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 5,
            backoff: Backoff::default(),
            retry_on_status: vec![429],
            retry_on_transport: true,
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.enabled && self.retry_on_status.contains(&status)
    }

    pub fn should_retry_error(&self, error: &HttpError) -> bool {
        self.enabled && self.retry_on_transport && error.retryable()
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        self.enabled && attempt < self.max_retries
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Serializable retry knobs, as they appear in the tracker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_factor: f64,
    pub backoff_max_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base_ms: 500,
            backoff_factor: 2.0,
            backoff_max_ms: 30_000,
            jitter: false,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff: Backoff {
                base: Duration::from_millis(settings.backoff_base_ms),
                factor: settings.backoff_factor,
                max: Duration::from_millis(settings.backoff_max_ms),
                jitter: settings.jitter,
            },
            ..Self::default()
        }
    }
}
