// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::HELLO_KIND;
use crate::types::resource::{DesiredResource, ResourceKey};
use kube::{CustomResource, ResourceExt};
use schemars::gen::SchemaGenerator;
use schemars::schema::{Schema, SchemaObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "unusualfor.com", version = "v1", kind = "Hello", plural = "hellos")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct HelloSpec {
    /// Who to greet. Defaults to "world" when unset.
    ///
    /// Kept untyped so a malformed value reaches the reconciler instead of
    /// failing the whole watch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "any_value")]
    pub name: Option<Value>,
}

/// Schema accepting any JSON value
fn any_value(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject::default();
    schema
        .extensions
        .insert("x-kubernetes-preserve-unknown-fields".to_string(), Value::Bool(true));
    schema.extensions.insert("nullable".to_string(), Value::Bool(true));
    Schema::Object(schema)
}

impl Hello {
    /// Identity of this resource as a reconcile key
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(
            HELLO_KIND,
            self.namespace().unwrap_or_default(),
            self.name_any(),
        )
    }

    /// Snapshot this resource as an opaque desired-state record
    pub fn to_desired(&self) -> DesiredResource {
        let spec = match serde_json::to_value(&self.spec) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };

        DesiredResource {
            key: self.key(),
            spec,
            resource_version: self.resource_version(),
        }
    }
}
