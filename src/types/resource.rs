// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kind-agnostic records the engine moves between the informer, queue, reconciler and store.

use crate::constants::{labels, CHILD_KIND, CHILD_PREFIX};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Data carried by a child resource
pub type Payload = BTreeMap<String, String>;

/// `(kind, namespace, name)` identity of a resource, also used as the unit of queued work
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Deterministic key of the single child owned by this resource
    pub fn child_key(&self) -> ResourceKey {
        ResourceKey::new(
            CHILD_KIND,
            self.namespace.clone(),
            format!("{}-{}", CHILD_PREFIX, self.name),
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// User-declared state, read-only to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredResource {
    pub key: ResourceKey,
    pub spec: BTreeMap<String, Value>,
    pub resource_version: Option<String>,
}

/// Derived object realising a [`DesiredResource`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChildResource {
    pub key: ResourceKey,
    pub payload: Payload,
    pub labels: BTreeMap<String, String>,
    /// Name of the owning desired resource, in the same namespace
    pub owner: Option<String>,
    pub resource_version: Option<String>,
}

impl ChildResource {
    /// Build the child for `owner` carrying `payload`, with the operator's labels attached
    pub fn for_owner(owner: &ResourceKey, payload: Payload) -> Self {
        Self {
            key: owner.child_key(),
            payload,
            labels: BTreeMap::from([(labels::APP.to_string(), labels::APP_VALUE.to_string())]),
            owner: Some(owner.name.clone()),
            resource_version: None,
        }
    }

    /// Key of the desired resource that owns this child, if recorded
    pub fn owner_key(&self, owner_kind: &str) -> Option<ResourceKey> {
        self.owner
            .as_ref()
            .map(|name| ResourceKey::new(owner_kind, self.key.namespace.clone(), name.clone()))
    }
}
