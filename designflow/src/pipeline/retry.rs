//! Retry policy for unit attempts.
//!
//! Only results flagged `retryable` are attempted again (timeouts, and
//! failures a unit marks itself). Delays follow a backoff strategy with
//! optional jitter so sibling units do not retry in lockstep.

use crate::core::UnitResult;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^retry
    #[default]
    Exponential,
    /// delay = base * (retry + 1)
    Linear,
    /// delay = base
    Constant,
}

/// Jitter strategy applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Uniform in `[0, delay]`.
    #[default]
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    pub max_attempts: usize,
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5000,
            max_delay_ms: 60_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Delay before retry number `retry` (0 for the first retry).
    #[must_use]
    pub fn delay_for(&self, retry: usize) -> Duration {
        let base = self.base_delay_ms;
        let max = self.max_delay_ms;
        let exponent = u32::try_from(retry).unwrap_or(u32::MAX);
        let multiplier = u64::try_from(retry).unwrap_or(u64::MAX).saturating_add(1);

        let delay = match self.backoff {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(exponent)),
            BackoffStrategy::Linear => base.saturating_mul(multiplier),
            BackoffStrategy::Constant => base,
        }
        .min(max);

        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the delay.
    Retry(Duration),
    /// Attempts are used up.
    GiveUp,
    /// The result is final (success or a non-retryable failure).
    Done,
}

/// Decides what to do after `attempts` attempts produced `result`.
#[must_use]
pub fn decide(
    result: &UnitResult,
    attempts: usize,
    max_attempts: usize,
    config: &RetryConfig,
) -> RetryDecision {
    if result.is_success() || !result.retryable {
        return RetryDecision::Done;
    }
    if attempts >= max_attempts {
        return RetryDecision::GiveUp;
    }
    RetryDecision::Retry(config.delay_for(attempts.saturating_sub(1)))
}
