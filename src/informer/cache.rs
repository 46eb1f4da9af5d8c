// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Last observed desired state per key, shared between the informer and workers.

use crate::types::{DesiredResource, ResourceKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct DesiredCache {
    entries: Arc<RwLock<HashMap<ResourceKey, DesiredResource>>>,
}

impl DesiredCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &ResourceKey) -> Option<DesiredResource> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store `resource`, returning the entry it replaced
    pub async fn insert(&self, resource: DesiredResource) -> Option<DesiredResource> {
        self.entries
            .write()
            .await
            .insert(resource.key.clone(), resource)
    }

    pub async fn remove(&self, key: &ResourceKey) -> Option<DesiredResource> {
        self.entries.write().await.remove(key)
    }

    pub async fn keys(&self) -> Vec<ResourceKey> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
