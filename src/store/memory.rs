// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-process store with optimistic concurrency and scripted failures

use crate::error::StoreError;
use crate::store::Store;
use crate::types::{ChildResource, ResourceKey};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operation, used to script failures and inspect calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    Create,
    Replace,
    Delete,
    List,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ResourceKey, ChildResource>,
    next_version: u64,
    faults: HashMap<Op, VecDeque<StoreError>>,
    calls: Vec<(Op, ResourceKey)>,
}

/// Cloneable in-memory store; clones share state
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call of `op` with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: Op, err: StoreError) {
        self.state().faults.entry(op).or_default().push_back(err);
    }

    /// Write `child` directly, bypassing version checks, as an external actor would
    pub fn put(&self, mut child: ChildResource) -> ChildResource {
        let mut state = self.state();
        child.resource_version = Some(bump(&mut state));
        state.objects.insert(child.key.clone(), child.clone());
        child
    }

    /// Current stored state of `key`
    pub fn snapshot(&self, key: &ResourceKey) -> Option<ChildResource> {
        self.state().objects.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<(Op, ResourceKey)> {
        self.state().calls.clone()
    }

    /// Record the call and pop a scripted failure for it, if any
    fn begin(&self, op: Op, key: &ResourceKey) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.state();
        state.calls.push((op, key.clone()));
        match state.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

fn bump(state: &mut State) -> String {
    state.next_version += 1;
    state.next_version.to_string()
}

impl Store for MemoryStore {
    async fn get(&self, key: &ResourceKey) -> Result<ChildResource, StoreError> {
        let state = self.begin(Op::Get, key)?;
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn create(&self, child: &ChildResource) -> Result<ChildResource, StoreError> {
        let mut state = self.begin(Op::Create, &child.key)?;
        if state.objects.contains_key(&child.key) {
            return Err(StoreError::AlreadyExists(child.key.to_string()));
        }

        let mut created = child.clone();
        created.resource_version = Some(bump(&mut state));
        state.objects.insert(created.key.clone(), created.clone());
        Ok(created)
    }

    async fn replace(
        &self,
        child: &ChildResource,
        expected_version: Option<&str>,
    ) -> Result<ChildResource, StoreError> {
        let mut state = self.begin(Op::Replace, &child.key)?;
        let current = state
            .objects
            .get(&child.key)
            .ok_or_else(|| StoreError::NotFound(child.key.to_string()))?;

        if let Some(expected) = expected_version {
            if current.resource_version.as_deref() != Some(expected) {
                return Err(StoreError::Conflict(child.key.to_string()));
            }
        }

        let mut replaced = child.clone();
        replaced.resource_version = Some(bump(&mut state));
        state.objects.insert(replaced.key.clone(), replaced.clone());
        Ok(replaced)
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError> {
        let mut state = self.begin(Op::Delete, key)?;
        state
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<ChildResource>, StoreError> {
        let scope = ResourceKey::new(kind, namespace.unwrap_or_default(), "");
        let state = self.begin(Op::List, &scope)?;
        Ok(state
            .objects
            .values()
            .filter(|c| c.key.kind == kind)
            .filter(|c| namespace.map_or(true, |ns| c.key.namespace == ns))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Payload;

    fn child(name: &str, greeting: &str) -> ChildResource {
        let owner = ResourceKey::new("Hello", "default", name);
        ChildResource::for_owner(
            &owner,
            Payload::from([("greeting".to_string(), greeting.to_string())]),
        )
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let created = store.create(&child("x", "Hello, world!")).await.unwrap();

        let fetched = store.get(&created.key).await.unwrap();

        assert_eq!(fetched, created);
        assert!(fetched.resource_version.is_some());
    }

    #[tokio::test]
    async fn test_create_twice_already_exists() {
        let store = MemoryStore::new();
        store.create(&child("x", "a")).await.unwrap();

        let err = store.create(&child("x", "b")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_replace_with_stale_version_conflicts() {
        let store = MemoryStore::new();
        let created = store.create(&child("x", "a")).await.unwrap();
        store.put(child("x", "external"));

        let err = store
            .replace(&child("x", "b"), created.resource_version.as_deref())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_replace_missing_not_found() {
        let store = MemoryStore::new();
        let err = store.replace(&child("x", "a"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_missing_not_found() {
        let store = MemoryStore::new();
        let err = store.delete(&child("x", "a").key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_scripted_failure_consumed_once() {
        let store = MemoryStore::new();
        store.fail_next(Op::Create, StoreError::Transient("boom".to_string()));

        assert!(store.create(&child("x", "a")).await.is_err());
        assert!(store.create(&child("x", "a")).await.is_ok());
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_namespace() {
        let store = MemoryStore::new();
        store.put(child("x", "a"));
        let mut other = child("y", "b");
        other.key.namespace = "other".to_string();
        store.put(other);

        assert_eq!(store.list("ConfigMap", None).await.unwrap().len(), 2);
        assert_eq!(store.list("ConfigMap", Some("other")).await.unwrap().len(), 1);
        assert!(store.list("Secret", None).await.unwrap().is_empty());
    }
}
