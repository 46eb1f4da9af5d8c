// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource types: the `Hello` CRD and the engine's kind-agnostic records.

pub mod hello;
pub mod resource;

pub use hello::{Hello, HelloSpec};
pub use resource::{ChildResource, DesiredResource, Payload, ResourceKey};
