// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Only watch this namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    pub workers: usize,
    pub resync_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Upper bound on every single store call
    pub call_timeout: Duration,
    pub shutdown_grace: Duration,
    pub health_addr: SocketAddr,
    pub fatal_threshold: usize,
    pub fatal_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            watch_namespace: None,
            workers: 2,
            resync_interval: Duration::from_secs(60),
            backoff_base: Duration::from_millis(1000),
            backoff_max: Duration::from_secs(300),
            call_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(30),
            health_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            fatal_threshold: 5,
            fatal_window: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let workers = parse_or(&lookup, "HELLO_WORKERS", defaults.workers)?;
        if workers == 0 {
            bail!("HELLO_WORKERS must be at least 1");
        }

        let resync_interval = nonzero_secs_or(&lookup, "HELLO_RESYNC_INTERVAL_SECS", defaults.resync_interval)?;
        let backoff_base = parse_or(&lookup, "HELLO_BACKOFF_BASE_MS", defaults.backoff_base.as_millis() as u64)
            .map(Duration::from_millis)?;
        let backoff_max = secs_or(&lookup, "HELLO_BACKOFF_MAX_SECS", defaults.backoff_max)?;
        if backoff_base.is_zero() || backoff_base > backoff_max {
            bail!(
                "HELLO_BACKOFF_BASE_MS ({:?}) must be non-zero and not exceed HELLO_BACKOFF_MAX_SECS ({:?})",
                backoff_base,
                backoff_max
            );
        }

        let fatal_threshold = parse_or(&lookup, "HELLO_FATAL_THRESHOLD", defaults.fatal_threshold)?;
        if fatal_threshold == 0 {
            bail!("HELLO_FATAL_THRESHOLD must be at least 1");
        }

        Ok(Config {
            watch_namespace,
            workers,
            resync_interval,
            backoff_base,
            backoff_max,
            call_timeout: nonzero_secs_or(&lookup, "HELLO_CALL_TIMEOUT_SECS", defaults.call_timeout)?,
            shutdown_grace: secs_or(&lookup, "HELLO_SHUTDOWN_GRACE_SECS", defaults.shutdown_grace)?,
            health_addr: parse_or(&lookup, "HELLO_HEALTH_ADDR", defaults.health_addr)?,
            fatal_threshold,
            fatal_window: nonzero_secs_or(&lookup, "HELLO_FATAL_WINDOW_SECS", defaults.fatal_window)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}

fn nonzero_secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let value = secs_or(lookup, key, default)?;
    if value.is_zero() {
        bail!("{} must be at least 1 second", key);
    }
    Ok(value)
}
