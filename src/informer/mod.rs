// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Informer - turns the raw Hello watch into normalised events and keeps the desired cache.
//!
//! Any watch failure tears the stream down and starts a fresh one, which relists
//! everything. Every object seen during a relist is reported as `Resynced`, and
//! cached objects missing from the relist are reported as `Deleted`.

pub mod cache;
pub mod dispatch;

pub use cache::DesiredCache;
pub use dispatch::Dispatcher;

use crate::health::Health;
use crate::queue::Backoff;
use crate::types::{DesiredResource, Hello, ResourceKey};
use futures::{Stream, StreamExt};
use kube_runtime::watcher;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
    Resynced,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Added,
        EventKind::Modified,
        EventKind::Deleted,
        EventKind::Resynced,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Normalised change to a desired resource, carrying its latest snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct InformerEvent {
    pub kind: EventKind,
    pub resource: DesiredResource,
}

pub struct Informer {
    cache: DesiredCache,
    health: Health,
    backoff: Backoff,
    /// Keys seen during an in-progress relist
    relisting: Option<HashSet<ResourceKey>>,
}

impl Informer {
    pub fn new(cache: DesiredCache, health: Health, backoff: Backoff) -> Self {
        Self {
            cache,
            health,
            backoff,
            relisting: None,
        }
    }

    /// Apply one raw watch event to the cache and return the normalised events it produces
    pub async fn handle(&mut self, event: watcher::Event<Hello>) -> Vec<InformerEvent> {
        match event {
            watcher::Event::Apply(hello) => {
                let resource = hello.to_desired();
                let kind = match self.cache.insert(resource.clone()).await {
                    Some(_) => EventKind::Modified,
                    None => EventKind::Added,
                };
                vec![InformerEvent { kind, resource }]
            }
            watcher::Event::Delete(hello) => {
                let resource = hello.to_desired();
                self.cache.remove(&resource.key).await;
                vec![InformerEvent {
                    kind: EventKind::Deleted,
                    resource,
                }]
            }
            watcher::Event::Init => {
                debug!("Relist started");
                self.relisting = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(hello) => {
                let resource = hello.to_desired();
                if let Some(seen) = self.relisting.as_mut() {
                    seen.insert(resource.key.clone());
                }
                self.cache.insert(resource.clone()).await;
                vec![InformerEvent {
                    kind: EventKind::Resynced,
                    resource,
                }]
            }
            watcher::Event::InitDone => {
                let seen = self.relisting.take().unwrap_or_default();
                let mut events = Vec::new();

                for key in self.cache.keys().await {
                    if seen.contains(&key) {
                        continue;
                    }
                    if let Some(resource) = self.cache.remove(&key).await {
                        debug!(key = %key, "Gone after relist");
                        events.push(InformerEvent {
                            kind: EventKind::Deleted,
                            resource,
                        });
                    }
                }

                info!(resources = seen.len(), "Relist complete");
                events
            }
        }
    }

    /// Watch forever, restarting with a full relist whenever the stream fails or ends
    pub async fn run<F, S>(mut self, connect: F, dispatcher: Dispatcher)
    where
        F: Fn() -> S,
        S: Stream<Item = Result<watcher::Event<Hello>, watcher::Error>> + Send,
    {
        let mut failures: u32 = 0;

        loop {
            let mut stream = std::pin::pin!(connect());

            loop {
                match stream.next().await {
                    Some(Ok(event)) => {
                        let relisted = matches!(event, watcher::Event::InitDone);
                        for normalised in self.handle(event).await {
                            debug!(kind = %normalised.kind, key = %normalised.resource.key, "Dispatching");
                            dispatcher.dispatch(&normalised);
                        }
                        if relisted {
                            failures = 0;
                            self.health.set_ready();
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Watch failed, restarting with a full relist");
                        break;
                    }
                    None => {
                        warn!("Watch stream ended, restarting with a full relist");
                        break;
                    }
                }
            }

            failures = failures.saturating_add(1);
            let delay = self.backoff.delay(failures);
            debug!(failures, delay_ms = delay.as_millis() as u64, "Reconnecting watch");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_hello;
    use futures::stream::{self, BoxStream};
    use kube::core::ErrorResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn informer() -> (Informer, DesiredCache, Health) {
        let cache = DesiredCache::new();
        let health = Health::new(5, Duration::from_secs(300));
        let informer = Informer::new(
            cache.clone(),
            health.clone(),
            Backoff::new(Duration::from_millis(100), Duration::from_secs(1)),
        );
        (informer, cache, health)
    }

    fn kinds(events: &[InformerEvent]) -> Vec<(EventKind, String)> {
        events
            .iter()
            .map(|e| (e.kind, e.resource.key.name.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_apply_new_then_existing() {
        let (mut informer, cache, _) = informer();

        let first = informer.handle(watcher::Event::Apply(make_hello("x", Some("world")))).await;
        let second = informer.handle(watcher::Event::Apply(make_hello("x", Some("alice")))).await;

        assert_eq!(kinds(&first), vec![(EventKind::Added, "x".to_string())]);
        assert_eq!(kinds(&second), vec![(EventKind::Modified, "x".to_string())]);
        let cached = cache.get(&ResourceKey::new("Hello", "default", "x")).await.unwrap();
        assert_eq!(cached.spec.get("name"), Some(&serde_json::json!("alice")));
    }

    #[tokio::test]
    async fn test_delete_evicts_from_cache() {
        let (mut informer, cache, _) = informer();
        informer.handle(watcher::Event::Apply(make_hello("x", None))).await;

        let events = informer.handle(watcher::Event::Delete(make_hello("x", None))).await;

        assert_eq!(kinds(&events), vec![(EventKind::Deleted, "x".to_string())]);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_relist_reports_resynced_and_prunes_missing() {
        let (mut informer, cache, _) = informer();
        informer.handle(watcher::Event::Apply(make_hello("kept", None))).await;
        informer.handle(watcher::Event::Apply(make_hello("gone", None))).await;

        let mut events = informer.handle(watcher::Event::Init).await;
        events.extend(informer.handle(watcher::Event::InitApply(make_hello("kept", None))).await);
        events.extend(informer.handle(watcher::Event::InitDone).await);

        assert_eq!(
            kinds(&events),
            vec![
                (EventKind::Resynced, "kept".to_string()),
                (EventKind::Deleted, "gone".to_string()),
            ]
        );
        assert_eq!(cache.keys().await, vec![ResourceKey::new("Hello", "default", "kept")]);
    }

    fn watch_error() -> watcher::Error {
        watcher::Error::WatchFailed(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "connection reset".to_string(),
            reason: "InternalError".to_string(),
            code: 500,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_relists_after_disconnect() {
        let (informer, cache, health) = informer();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let dispatcher = EventKind::ALL.iter().fold(Dispatcher::new(), |d, kind| {
            let recorder = recorder.clone();
            d.on(*kind, move |e| {
                recorder
                    .lock()
                    .unwrap()
                    .push((e.kind, e.resource.key.name.clone()))
            })
        });

        let connects = Arc::new(AtomicUsize::new(0));
        let counter = connects.clone();
        let connect = move || -> BoxStream<'static, Result<watcher::Event<Hello>, watcher::Error>> {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => stream::iter(vec![
                    Ok(watcher::Event::Init),
                    Ok(watcher::Event::InitApply(make_hello("a", None))),
                    Ok(watcher::Event::InitDone),
                    Ok(watcher::Event::Apply(make_hello("b", None))),
                    Err(watch_error()),
                ])
                .boxed(),
                1 => stream::iter(vec![
                    Ok(watcher::Event::Init),
                    Ok(watcher::Event::InitApply(make_hello("a", None))),
                    Ok(watcher::Event::InitDone),
                ])
                .chain(stream::pending())
                .boxed(),
                _ => stream::pending().boxed(),
            }
        };

        let task = tokio::spawn(informer.run(connect, dispatcher));
        tokio::time::sleep(Duration::from_secs(10)).await;
        task.abort();

        assert!(health.is_ready());
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (EventKind::Resynced, "a".to_string()),
                (EventKind::Added, "b".to_string()),
                (EventKind::Resynced, "a".to_string()),
                (EventKind::Deleted, "b".to_string()),
            ]
        );
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_not_ready_before_first_relist() {
        let (mut informer, _, health) = informer();
        informer.handle(watcher::Event::Init).await;
        assert!(!health.is_ready());
    }
}
