// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Exponential backoff with jitter for failed reconciliations.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff policy: `base * 2^(retry - 1)` plus up to 50% jitter, never above `max`
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(300),
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before the given (1-based) retry, without jitter
    pub fn nominal(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32);
        let factor = 2u64.saturating_pow(exponent) as f64;
        let secs = (self.base.as_secs_f64() * factor).min(self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Delay before the given (1-based) retry
    pub fn delay(&self, retry: u32) -> Duration {
        let nominal = self.nominal(retry);
        // Jitter: 1.0x to 1.5x of the nominal delay
        let jitter = rand::thread_rng().gen_range(1.0..1.5);
        let jittered = Duration::from_secs_f64(nominal.as_secs_f64() * jitter);
        jittered.clamp(self.base, self.max)
    }
}
