// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Table mapping informer event kinds to handlers, assembled at startup.

use crate::informer::{EventKind, InformerEvent};
use crate::queue::WorkQueue;
use crate::types::ResourceKey;
use std::collections::HashMap;

pub type Handler = Box<dyn Fn(&InformerEvent) + Send + Sync>;

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`. Handlers run in registration order.
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&InformerEvent) + Send + Sync + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
        self
    }

    /// Table that enqueues the affected key for every kind of event
    pub fn enqueueing(queue: WorkQueue<ResourceKey>) -> Self {
        EventKind::ALL.iter().fold(Self::new(), |dispatcher, kind| {
            let queue = queue.clone();
            dispatcher.on(*kind, move |event| queue.add(event.resource.key.clone()))
        })
    }

    /// Run every handler registered for the event's kind, returning how many ran
    pub fn dispatch(&self, event: &InformerEvent) -> usize {
        let Some(handlers) = self.handlers.get(&event.kind) else {
            return 0;
        };

        for handler in handlers {
            handler(event);
        }
        handlers.len()
    }
}
