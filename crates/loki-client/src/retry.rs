// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::constants::{DEFAULT_BACKOFF_JITTER, DEFAULT_BACKOFF_STEP, DEFAULT_SEND_ATTEMPTS};

/// How many times a batch is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Retry right away, up to the given number of attempts.
    Immediate(u32),
    /// After failed attempt `i` (1-indexed), wait `i * step` plus a uniform
    /// random jitter in `[0, jitter)`.
    LinearBackoff {
        attempts: u32,
        step: Duration,
        jitter: Duration,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::LinearBackoff {
            attempts: DEFAULT_SEND_ATTEMPTS,
            step: DEFAULT_BACKOFF_STEP,
            jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

impl RetryStrategy {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            RetryStrategy::Immediate(attempts) | RetryStrategy::LinearBackoff { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Wait before the attempt that follows failed attempt `attempt`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::Immediate(_) => Duration::ZERO,
            RetryStrategy::LinearBackoff { step, jitter, .. } => {
                step
                    .saturating_mul(attempt)
                    .saturating_add(random_jitter(*jitter))
            }
        }
    }
}

fn random_jitter(bound: Duration) -> Duration {
    let nanos = u64::try_from(bound.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(fastrand::u64(..nanos))
}
