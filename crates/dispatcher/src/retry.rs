//! Retry policy consulted by the send-task after every attempt

use std::time::Duration;

use contracts::{RetryConfig, RetryPolicyKind};

use crate::outcome::SendOutcome;

/// What the send-task does after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Stop, the outcome is final
    Done,
    /// Wait `delay`, then run attempt number `attempt`
    Retry { attempt: u32, delay: Duration },
    /// Give the batch up after a retryable failure on the last attempt
    Abort,
}

/// Retry decision rules.
///
/// `Never` keeps every outcome final, so the retried and aborted counters
/// stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Never,
    /// Exponential backoff on retryable outcomes
    Backoff {
        /// Total attempts including the first one
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
    },
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        match config.policy {
            RetryPolicyKind::Never => RetryPolicy::Never,
            RetryPolicyKind::Backoff => RetryPolicy::Backoff {
                max_attempts: config.max_attempts.max(1),
                initial_delay: Duration::from_millis(config.initial_delay_ms),
                max_delay: Duration::from_millis(config.max_delay_ms),
            },
        }
    }

    /// Decide the next step after `attempt` (1-based) produced `outcome`
    pub fn decide(&self, outcome: &SendOutcome, attempt: u32) -> NextStep {
        let RetryPolicy::Backoff {
            max_attempts,
            initial_delay,
            max_delay,
        } = *self
        else {
            return NextStep::Done;
        };

        if !outcome.is_retryable() {
            return NextStep::Done;
        }
        if attempt >= max_attempts {
            return NextStep::Abort;
        }

        NextStep::Retry {
            attempt: attempt + 1,
            delay: backoff_delay(initial_delay, max_delay, attempt),
        }
    }
}

/// `initial * 2^(attempt - 1)`, capped at `max`
fn backoff_delay(initial: Duration, max: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    initial.saturating_mul(1u32 << exp).min(max)
}
