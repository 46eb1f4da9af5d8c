// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ConfigMap-backed store on top of the Kubernetes API

use crate::constants::{annotations, labels, CHILD_KIND};
use crate::error::StoreError;
use crate::store::Store;
use crate::types::{ChildResource, ResourceKey};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{DeleteParams, ListParams, ObjectMeta, PostParams},
    Api, Client, ResourceExt,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

/// Store of children as ConfigMaps. Every call is bounded by `call_timeout`.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    call_timeout: Duration,
}

impl KubeStore {
    pub fn new(client: Client, call_timeout: Duration) -> Self {
        Self { client, call_timeout }
    }

    fn api(&self, kind: &str, namespace: Option<&str>) -> Result<Api<ConfigMap>, StoreError> {
        if kind != CHILD_KIND {
            return Err(StoreError::Fatal(format!("Unsupported kind: {}", kind)));
        }

        Ok(match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        })
    }

    async fn timed<T, F>(&self, what: &str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(|e| StoreError::from_kube(what, e)),
            Err(_) => Err(StoreError::Transient(format!(
                "{} timed out after {:?}",
                what, self.call_timeout
            ))),
        }
    }
}

impl Store for KubeStore {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &ResourceKey) -> Result<ChildResource, StoreError> {
        let api = self.api(&key.kind, Some(&key.namespace))?;
        let cm = self.timed(&key.to_string(), api.get(&key.name)).await?;
        Ok(from_config_map(&cm))
    }

    #[instrument(skip_all, fields(key = %child.key))]
    async fn create(&self, child: &ChildResource) -> Result<ChildResource, StoreError> {
        let api = self.api(&child.key.kind, Some(&child.key.namespace))?;
        let cm = to_config_map(child, None);
        let created = self
            .timed(&child.key.to_string(), api.create(&PostParams::default(), &cm))
            .await?;
        debug!("Created {}", child.key);
        Ok(from_config_map(&created))
    }

    #[instrument(skip_all, fields(key = %child.key))]
    async fn replace(
        &self,
        child: &ChildResource,
        expected_version: Option<&str>,
    ) -> Result<ChildResource, StoreError> {
        let api = self.api(&child.key.kind, Some(&child.key.namespace))?;
        let cm = to_config_map(child, expected_version);
        let replaced = self
            .timed(
                &child.key.to_string(),
                api.replace(&child.key.name, &PostParams::default(), &cm),
            )
            .await?;
        debug!("Replaced {}", child.key);
        Ok(from_config_map(&replaced))
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError> {
        let api = self.api(&key.kind, Some(&key.namespace))?;
        self.timed(&key.to_string(), api.delete(&key.name, &DeleteParams::default()))
            .await?;
        debug!("Deleted {}", key);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<ChildResource>, StoreError> {
        let api = self.api(kind, namespace)?;
        let lp = ListParams::default().labels(labels::SELECTOR);
        let list = self.timed(kind, api.list(&lp)).await?;
        Ok(list.items.iter().map(from_config_map).collect())
    }
}

/// Build the ConfigMap for `child`, pinned to `resource_version` when given
fn to_config_map(child: &ChildResource, resource_version: Option<&str>) -> ConfigMap {
    let annotations = child
        .owner
        .as_ref()
        .map(|owner| BTreeMap::from([(annotations::OWNER.to_string(), owner.clone())]));

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(child.key.name.clone()),
            namespace: Some(child.key.namespace.clone()),
            labels: Some(child.labels.clone()),
            annotations,
            resource_version: resource_version.map(str::to_string),
            ..Default::default()
        },
        data: Some(child.payload.clone()),
        ..Default::default()
    }
}

fn from_config_map(cm: &ConfigMap) -> ChildResource {
    ChildResource {
        key: ResourceKey::new(CHILD_KIND, cm.namespace().unwrap_or_default(), cm.name_any()),
        payload: cm.data.clone().unwrap_or_default(),
        labels: cm.labels().clone(),
        owner: cm.annotations().get(annotations::OWNER).cloned(),
        resource_version: cm.resource_version(),
    }
}
