// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed CRUD access to child resources, with classified errors.

pub mod kube_store;
pub mod memory;

pub use kube_store::KubeStore;
pub use memory::{MemoryStore, Op};

use crate::error::StoreError;
use crate::types::{ChildResource, ResourceKey};
use std::future::Future;

/// Store of child resources.
///
/// Implementations must be safe for concurrent use by every worker.
pub trait Store: Send + Sync + 'static {
    /// Fetch the current state of `key`
    fn get(&self, key: &ResourceKey) -> impl Future<Output = Result<ChildResource, StoreError>> + Send;

    /// Create `child`; fails with `AlreadyExists` if it is present
    fn create(&self, child: &ChildResource) -> impl Future<Output = Result<ChildResource, StoreError>> + Send;

    /// Replace `child`, failing with `Conflict` if the stored version is not `expected_version`
    fn replace(
        &self,
        child: &ChildResource,
        expected_version: Option<&str>,
    ) -> impl Future<Output = Result<ChildResource, StoreError>> + Send;

    fn delete(&self, key: &ResourceKey) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List managed resources of `kind`, optionally within a single namespace
    fn list(
        &self,
        kind: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ChildResource>, StoreError>> + Send;
}
