// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Periodic full resync: re-enqueue every known key plus owners of orphaned children.

use crate::constants::{CHILD_KIND, HELLO_KIND};
use crate::health::Health;
use crate::informer::DesiredCache;
use crate::queue::WorkQueue;
use crate::store::Store;
use crate::types::ResourceKey;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Enqueue every cached key and the owner of every managed child, returning how many keys were enqueued
#[instrument(skip_all)]
pub async fn resync_once<S: Store>(
    cache: &DesiredCache,
    store: &S,
    queue: &WorkQueue<ResourceKey>,
    namespace: Option<&str>,
) -> usize {
    let mut keys: BTreeSet<ResourceKey> = cache.keys().await.into_iter().collect();
    let known = keys.len();

    match store.list(CHILD_KIND, namespace).await {
        Ok(children) => {
            for child in children {
                match child.owner_key(HELLO_KIND) {
                    Some(owner) => {
                        keys.insert(owner);
                    }
                    None => debug!(child = %child.key, "Managed child without owner annotation"),
                }
            }
        }
        Err(e) => warn!(error = %e, "Failed to list children, resyncing known keys only"),
    }

    let orphans = keys.len() - known;
    let total = keys.len();
    for key in keys {
        queue.add(key);
    }

    info!(known, orphans, "Resync enqueued {} keys", total);
    total
}

/// Resync every `interval`, skipping ticks until the first full watch listing completed
pub async fn run_resync<S: Store>(
    cache: DesiredCache,
    store: S,
    queue: WorkQueue<ResourceKey>,
    health: Health,
    namespace: Option<String>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if queue.is_shutting_down() {
            return;
        }
        if !health.is_ready() {
            debug!("Skipping resync, initial listing not complete");
            continue;
        }
        resync_once(&cache, &store, &queue, namespace.as_deref()).await;
    }
}
