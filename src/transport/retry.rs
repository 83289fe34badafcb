//! Retry, exponential backoff with jitter, and per-attempt timeout.
//!
//! Every attempt gets its own time budget; an attempt that hangs is aborted
//! and counts against the retry budget like any other failure. Attempts are
//! retried on transport errors, timeouts and non-2xx statuses.
//!
//! Worst-case wall time of one logical send is
//! `max_attempts * attempt_timeout + sum(backoff delays)`; with the defaults
//! that is `3 * 30s + (2s + 4s) * 1.25 = 97.5s`.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::{AppError, Result};
use crate::models::ResilienceConfig;

use super::{Transport, TransportResponse};

/// Retry/backoff/timeout parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            jitter: config.jitter.clamp(0.0, 1.0),
            attempt_timeout: config.attempt_timeout(),
        }
    }

    /// Delay after the `failed_attempts`-th failure, before jitter.
    pub fn nominal_delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    /// Delay after the `failed_attempts`-th failure, with random jitter applied.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let nominal = self.nominal_delay(failed_attempts);
        if self.jitter <= 0.0 {
            return nominal;
        }
        let factor = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        nominal.mul_f64(factor)
    }

    /// Upper bound on the wall time of one logical send.
    pub fn worst_case_latency(&self) -> Duration {
        let attempts = self.attempt_timeout.saturating_mul(self.max_attempts);
        (1..self.max_attempts)
            .map(|n| self.nominal_delay(n).mul_f64(1.0 + self.jitter))
            .fold(attempts, Duration::saturating_add)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

/// Wraps a [`Transport`] with a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct ResilientTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> ResilientTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, url: &str, body: &serde_json::Value) -> Result<TransportResponse> {
        match tokio::time::timeout(self.policy.attempt_timeout, self.inner.post_json(url, body))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.policy.attempt_timeout)),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for ResilientTransport<T> {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<TransportResponse> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            let outcome = self.attempt(url, body).await;

            let failure = match &outcome {
                Ok(response) if response.is_success() => None,
                Ok(response) => Some(format!("HTTP {} {}", response.status, response.reason)),
                Err(e) => Some(e.to_string()),
            };
            let Some(failure) = failure else {
                return outcome;
            };

            if attempt >= max_attempts {
                log::debug!(
                    "Send failed on final attempt {}/{}: {}",
                    attempt,
                    max_attempts,
                    failure
                );
                return outcome;
            }

            let delay = self.policy.delay_for(attempt);
            log::warn!(
                "Send attempt {}/{} failed: {}. Retrying in {:?}",
                attempt,
                max_attempts,
                failure,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
