// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controller loop - drains the work queue, decides, and applies mutations to the store.
//!
//! Per key: `Dequeued → Reconciling → {Applied, Failed}`. Transient failures are
//! re-queued with backoff, a version conflict is retried once against freshly
//! fetched state, and fatal failures drop the key until it changes again.

pub mod resync;
pub mod sink;

pub use resync::{resync_once, run_resync};
pub use sink::{EventSink, Phase, ReconcileEvent, TracingSink};

use crate::error::{ErrorKind, ReconcileError, StoreError};
use crate::health::Health;
use crate::informer::DesiredCache;
use crate::queue::WorkQueue;
use crate::reconciler::{self, Decision};
use crate::store::Store;
use crate::types::{ChildResource, DesiredResource, Payload, ResourceKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, trace};

/// Result of handling one dequeued key
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Decision),
    Requeued { error: ErrorKind, delay: Duration },
    Dropped { reason: String },
    /// Previously dropped and unchanged since
    Skipped,
}

pub struct Controller<S> {
    store: S,
    cache: DesiredCache,
    queue: WorkQueue<ResourceKey>,
    health: Health,
    sink: Arc<dyn EventSink>,
    /// Keys dropped as fatal, with the desired version they failed at
    terminal: Mutex<HashMap<ResourceKey, Option<String>>>,
}

impl<S: Store> Controller<S> {
    pub fn new(
        store: S,
        cache: DesiredCache,
        queue: WorkQueue<ResourceKey>,
        health: Health,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            cache,
            queue,
            health,
            sink,
            terminal: Mutex::new(HashMap::new()),
        }
    }

    /// Worker loop: runs until the queue shuts down
    pub async fn run_worker(self: Arc<Self>, id: usize) {
        debug!(worker = id, "Worker started");
        while let Some(key) = self.queue.get().await {
            trace!(worker = id, key = %key, phase = %Phase::Dequeued);
            self.handle(&key).await;
        }
        debug!(worker = id, "Worker stopped");
    }

    /// Reconcile a key obtained from the queue and settle it there
    pub async fn handle(&self, key: &ResourceKey) -> Outcome {
        let desired = self.cache.get(key).await;
        let version = desired.as_ref().and_then(|d| d.resource_version.clone());

        if self.is_terminal(key, &version) {
            self.queue.done(key);
            debug!(key = %key, "Skipping key dropped at this version");
            return Outcome::Skipped;
        }

        trace!(key = %key, phase = %Phase::Reconciling);
        let result = self.reconcile(key, desired.as_ref()).await;
        self.queue.done(key);

        let (outcome, event) = match result {
            Ok(decision) => {
                let retry_count = self.queue.num_requeues(key);
                self.queue.forget(key);
                self.clear_terminal(key);
                let event = ReconcileEvent {
                    key: key.clone(),
                    phase: Phase::Applied,
                    outcome: decision.name().to_string(),
                    retry_count,
                    error_kind: None,
                };
                (Outcome::Applied(decision), event)
            }
            Err(e) if e.kind() == ErrorKind::Fatal => {
                let retry_count = self.queue.num_requeues(key);
                self.queue.forget(key);
                self.mark_terminal(key, version);
                self.health.record_fatal();
                let event = ReconcileEvent {
                    key: key.clone(),
                    phase: Phase::Failed,
                    outcome: "terminal".to_string(),
                    retry_count,
                    error_kind: Some(ErrorKind::Fatal),
                };
                (Outcome::Dropped { reason: e.to_string() }, event)
            }
            Err(e) => {
                let delay = self.queue.add_rate_limited(key.clone());
                debug!(key = %key, error = %e, delay_ms = delay.as_millis() as u64, "Re-queued");
                let event = ReconcileEvent {
                    key: key.clone(),
                    phase: Phase::Failed,
                    outcome: "requeued".to_string(),
                    retry_count: self.queue.num_requeues(key),
                    error_kind: Some(e.kind()),
                };
                (
                    Outcome::Requeued {
                        error: e.kind(),
                        delay,
                    },
                    event,
                )
            }
        };

        self.sink.record(&event);
        outcome
    }

    fn terminal(&self) -> MutexGuard<'_, HashMap<ResourceKey, Option<String>>> {
        self.terminal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_terminal(&self, key: &ResourceKey, version: &Option<String>) -> bool {
        self.terminal().get(key) == Some(version)
    }

    fn mark_terminal(&self, key: &ResourceKey, version: Option<String>) {
        self.terminal().insert(key.clone(), version);
    }

    fn clear_terminal(&self, key: &ResourceKey) {
        self.terminal().remove(key);
    }

    /// One reconciliation attempt for `key`, retrying once on a version conflict
    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile(
        &self,
        key: &ResourceKey,
        desired: Option<&DesiredResource>,
    ) -> Result<Decision, ReconcileError> {
        match self.converge(key, desired).await {
            Err(ReconcileError::Store(StoreError::Conflict(_))) => {
                debug!("Version conflict, retrying against fresh state");
                self.converge(key, desired).await.map_err(|e| match e {
                    ReconcileError::Store(StoreError::Conflict(what)) => ReconcileError::from(
                        StoreError::Transient(format!("repeated version conflict on {}", what)),
                    ),
                    other => other,
                })
            }
            other => other,
        }
    }

    /// Fetch the child, decide, and apply the decision
    async fn converge(
        &self,
        owner: &ResourceKey,
        desired: Option<&DesiredResource>,
    ) -> Result<Decision, ReconcileError> {
        let child_key = owner.child_key();
        let observed = self.fetch(&child_key).await?;
        let decision = reconciler::reconcile(desired, observed.as_ref())?;

        match &decision {
            Decision::NoOp => {}
            Decision::Create(payload) => self.create(owner, payload).await?,
            Decision::Update(payload) => {
                let version = observed.as_ref().and_then(|c| c.resource_version.as_deref());
                self.update(owner, payload, version).await?
            }
            Decision::Delete => match self.store.delete(&child_key).await {
                Ok(()) => info!(child = %child_key, "Deleted child"),
                Err(StoreError::NotFound(_)) => debug!(child = %child_key, "Child already gone"),
                Err(e) => return Err(e.into()),
            },
        }

        Ok(decision)
    }

    async fn fetch(&self, key: &ResourceKey) -> Result<Option<ChildResource>, StoreError> {
        match self.store.get(key).await {
            Ok(child) => Ok(Some(child)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create the child; if it appeared in the meantime, update it instead
    async fn create(&self, owner: &ResourceKey, payload: &Payload) -> Result<(), StoreError> {
        let child = ChildResource::for_owner(owner, payload.clone());
        match self.store.create(&child).await {
            Ok(_) => {
                info!(child = %child.key, "Created child");
                Ok(())
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!(child = %child.key, "Child already exists, updating");
                let Some(current) = self.fetch(&child.key).await? else {
                    return Err(StoreError::Transient(format!(
                        "{} vanished while being created",
                        child.key
                    )));
                };
                if current.payload == *payload {
                    return Ok(());
                }
                self.store
                    .replace(&child, current.resource_version.as_deref())
                    .await?;
                info!(child = %child.key, "Updated child");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the child at `version`; if it is gone, create it instead
    async fn update(
        &self,
        owner: &ResourceKey,
        payload: &Payload,
        version: Option<&str>,
    ) -> Result<(), StoreError> {
        let child = ChildResource::for_owner(owner, payload.clone());
        match self.store.replace(&child, version).await {
            Ok(_) => {
                info!(child = %child.key, "Updated child");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                debug!(child = %child.key, "Child disappeared, recreating");
                self.create(owner, payload).await
            }
            Err(e) => Err(e),
        }
    }
}
