// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod health;
pub mod informer;
pub mod kubernetes;
pub mod queue;
pub mod reconciler;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_utils;
