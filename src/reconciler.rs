// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pure reconciliation decisions: desired spec + observed child → mutation.
//!
//! Nothing in here performs I/O. The controller renders the desired payload,
//! fetches the observed child and asks [`decide`] what to do about it.

use crate::constants::{DEFAULT_PERSON, GREETING_KEY};
use crate::error::InvalidSpec;
use crate::types::{ChildResource, DesiredResource, Payload};
use serde_json::Value;

/// Mutation needed to converge a child on its desired state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoOp,
    Create(Payload),
    Update(Payload),
    Delete,
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Decision::NoOp => "noop",
            Decision::Create(_) => "create",
            Decision::Update(_) => "update",
            Decision::Delete => "delete",
        }
    }
}

/// Render the child payload a desired resource calls for
pub fn render(desired: &DesiredResource) -> Result<Payload, InvalidSpec> {
    let invalid = |reason: &str| InvalidSpec {
        key: desired.key.to_string(),
        reason: reason.to_string(),
    };

    let person = match desired.spec.get("name") {
        None | Some(Value::Null) => DEFAULT_PERSON,
        Some(Value::String(name)) if name.trim().is_empty() => {
            return Err(invalid("spec.name must not be empty"))
        }
        Some(Value::String(name)) => name.as_str(),
        Some(_) => return Err(invalid("spec.name must be a string")),
    };

    Ok(Payload::from([(
        GREETING_KEY.to_string(),
        format!("Hello, {}!", person),
    )]))
}

/// Decide how to converge `observed` on `desired`, where `desired` is the rendered payload
pub fn decide(desired: Option<&Payload>, observed: Option<&ChildResource>) -> Decision {
    match (desired, observed) {
        (None, None) => Decision::NoOp,
        (None, Some(_)) => Decision::Delete,
        (Some(payload), None) => Decision::Create(payload.clone()),
        (Some(payload), Some(child)) if child.payload != *payload => Decision::Update(payload.clone()),
        (Some(_), Some(_)) => Decision::NoOp,
    }
}

/// Render and decide in one step
pub fn reconcile(
    desired: Option<&DesiredResource>,
    observed: Option<&ChildResource>,
) -> Result<Decision, InvalidSpec> {
    let payload = desired.map(render).transpose()?;
    Ok(decide(payload.as_ref(), observed))
}
