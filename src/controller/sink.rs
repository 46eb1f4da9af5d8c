// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-attempt reconciliation records and where they go.

use crate::error::ErrorKind;
use crate::types::ResourceKey;
use std::fmt;
use tracing::{error, info, warn};

/// Where a key is in its reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Dequeued,
    Reconciling,
    Applied,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileEvent {
    pub key: ResourceKey,
    pub phase: Phase,
    /// Decision applied, or `requeued` / `terminal` on failure
    pub outcome: String,
    pub retry_count: u32,
    pub error_kind: Option<ErrorKind>,
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: &ReconcileEvent);
}

/// Emits every record as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &ReconcileEvent) {
        let error_kind = event.error_kind.map(|k| k.to_string()).unwrap_or_default();
        match (event.phase, event.error_kind) {
            (_, Some(ErrorKind::Fatal)) => error!(
                key = %event.key,
                phase = %event.phase,
                outcome = %event.outcome,
                retry_count = event.retry_count,
                error_kind = %error_kind,
                "Reconciliation failed permanently"
            ),
            (Phase::Failed, _) => warn!(
                key = %event.key,
                phase = %event.phase,
                outcome = %event.outcome,
                retry_count = event.retry_count,
                error_kind = %error_kind,
                "Reconciliation failed"
            ),
            _ => info!(
                key = %event.key,
                phase = %event.phase,
                outcome = %event.outcome,
                retry_count = event.retry_count,
                "Reconciled"
            ),
        }
    }
}
