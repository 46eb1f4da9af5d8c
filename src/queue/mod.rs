// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating work queue with per-key exclusivity and delayed re-queue.
//!
//! A key is in at most one of three places at a time from a worker's point of
//! view: queued, processing, or neither. Adding a key that is already queued is
//! a no-op. Adding a key that is being processed marks it dirty, and it is
//! queued again once the worker calls [`WorkQueue::done`].

pub mod backoff;

pub use backoff::Backoff;

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

struct State<K> {
    queue: VecDeque<K>,
    /// Keys that need processing: queued, or re-added while processing
    dirty: HashSet<K>,
    processing: HashSet<K>,
    /// Earliest pending deadline per delayed key
    waiting: HashMap<K, Instant>,
    retries: HashMap<K, u32>,
    shutting_down: bool,
}

struct Inner<K> {
    state: Mutex<State<K>>,
    notify: Notify,
    backoff: Backoff,
}

/// Cloneable handle to a shared work queue
pub struct WorkQueue<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    pub fn new(backoff: Backoff) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    waiting: HashMap::new(),
                    retries: HashMap::new(),
                    shutting_down: false,
                }),
                notify: Notify::new(),
                backoff,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<K>> {
        // State is only mutated in short non-panicking sections
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `key` as needing processing
    pub fn add(&self, key: K) {
        let mut state = self.state();
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }

        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            // Redelivered by done()
            return;
        }

        state.queue.push_back(key);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Wait for the next key. Returns `None` once the queue is shutting down.
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Finish processing `key`, re-queueing it if it was added in the meantime
    pub fn done(&self, key: &K) {
        let mut state = self.state();
        state.processing.remove(key);

        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Add `key` once `delay` has elapsed. An earlier pending deadline for the same key wins.
    pub fn add_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let deadline = Instant::now() + delay;
        {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            match state.waiting.get(&key) {
                Some(existing) if *existing <= deadline => return,
                _ => {
                    state.waiting.insert(key.clone(), deadline);
                }
            }
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let fire = {
                let mut state = queue.state();
                if state.waiting.get(&key) == Some(&deadline) {
                    state.waiting.remove(&key);
                    true
                } else {
                    false
                }
            };
            if fire {
                queue.add(key);
            }
        });
    }

    /// Re-queue `key` after its next backoff delay and bump its retry counter
    pub fn add_rate_limited(&self, key: K) -> Duration {
        let retry = {
            let mut state = self.state();
            let count = state.retries.entry(key.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };

        let delay = self.inner.backoff.delay(retry);
        trace!(retry, delay_ms = delay.as_millis() as u64, "Rate limited re-queue");
        self.add_after(key, delay);
        delay
    }

    /// Reset the retry counter of `key`
    pub fn forget(&self, key: &K) {
        self.state().retries.remove(key);
    }

    pub fn num_requeues(&self, key: &K) -> u32 {
        self.state().retries.get(key).copied().unwrap_or(0)
    }

    /// Stop handing out work and wake every waiting worker
    pub fn shut_down(&self) {
        self.state().shutting_down = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Number of keys ready to be handed out
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
