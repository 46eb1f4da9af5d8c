// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;
use thiserror::Error;

/// Classification of a store failure, driving the controller's retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Conflict,
    Transient,
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Transient => "Transient",
            ErrorKind::Fatal => "Fatal",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Version conflict on {0}")]
    Conflict(String),

    #[error("Transient store error: {0}")]
    Transient(String),

    #[error("Fatal store error: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Transient(_) => ErrorKind::Transient,
            StoreError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Classify a Kubernetes API error for the object named `what`
    pub fn from_kube(what: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => match resp.code {
                404 => StoreError::NotFound(what.to_string()),
                409 if resp.reason == "AlreadyExists" => StoreError::AlreadyExists(what.to_string()),
                409 => StoreError::Conflict(what.to_string()),
                400 | 422 => StoreError::Fatal(format!("{}: {}", what, resp.message)),
                _ => StoreError::Transient(format!("{}: {}", what, resp.message)),
            },
            kube::Error::SerdeError(e) => StoreError::Fatal(format!("{}: {}", what, e)),
            kube::Error::BuildRequest(e) => StoreError::Fatal(format!("{}: {}", what, e)),
            other => StoreError::Transient(format!("{}: {}", what, other)),
        }
    }
}

/// A desired spec that cannot be rendered into a child payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid spec for {key}: {reason}")]
pub struct InvalidSpec {
    pub key: String,
    pub reason: String,
}

/// Why a single reconciliation attempt failed
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidSpec(#[from] InvalidSpec),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Store(e) => e.kind(),
            ReconcileError::InvalidSpec(_) => ErrorKind::Fatal,
        }
    }
}

/// Process-level failures outside the reconcile loop
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Health server failed: {0}")]
    HealthServer(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OperatorError>;
