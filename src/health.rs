// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Readiness and liveness state of the operator

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

struct Inner {
    ready: AtomicBool,
    fatal: Mutex<VecDeque<Instant>>,
    fatal_threshold: usize,
    fatal_window: Duration,
}

/// Ready once the first full resync completed; unhealthy while fatal
/// reconciliations reach `fatal_threshold` within `fatal_window`.
#[derive(Clone)]
pub struct Health {
    inner: Arc<Inner>,
}

impl Health {
    pub fn new(fatal_threshold: usize, fatal_window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ready: AtomicBool::new(false),
                fatal: Mutex::new(VecDeque::new()),
                fatal_threshold,
                fatal_window,
            }),
        }
    }

    pub fn set_ready(&self) {
        if !self.inner.ready.swap(true, Ordering::SeqCst) {
            info!("Initial resync complete, operator is ready");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    pub fn record_fatal(&self) {
        let mut fatal = self.fatal();
        fatal.push_back(Instant::now());
        self.prune(&mut fatal);
    }

    /// Fatal outcomes within the current window
    pub fn recent_fatal(&self) -> usize {
        let mut fatal = self.fatal();
        self.prune(&mut fatal);
        fatal.len()
    }

    pub fn is_healthy(&self) -> bool {
        self.recent_fatal() < self.inner.fatal_threshold
    }

    fn fatal(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        self.inner.fatal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(&self, fatal: &mut VecDeque<Instant>) {
        let now = Instant::now();
        while fatal
            .front()
            .is_some_and(|at| now.duration_since(*at) > self.inner.fatal_window)
        {
            fatal.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_until_set() {
        let health = Health::new(3, Duration::from_secs(60));
        assert!(!health.is_ready());

        health.set_ready();
        assert!(health.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_at_threshold() {
        let health = Health::new(3, Duration::from_secs(60));
        health.record_fatal();
        health.record_fatal();
        assert!(health.is_healthy());

        health.record_fatal();
        assert!(!health.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_once_window_passes() {
        let health = Health::new(2, Duration::from_secs(60));
        health.record_fatal();
        health.record_fatal();
        assert!(!health.is_healthy());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(health.recent_fatal(), 0);
        assert!(health.is_healthy());
    }
}
