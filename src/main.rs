// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use futures::future::join_all;
use kube::{Api, Client};
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hello_operator::config::Config;
use hello_operator::controller::{run_resync, Controller, TracingSink};
use hello_operator::health::Health;
use hello_operator::informer::{DesiredCache, Dispatcher, Informer};
use hello_operator::kubernetes::wait_for_hello_crd;
use hello_operator::queue::{Backoff, WorkQueue};
use hello_operator::server;
use hello_operator::store::KubeStore;
use hello_operator::types::Hello;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Hello operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, workers={}, resync={:?}",
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.workers,
        config.resync_interval
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health = Health::new(config.fatal_threshold, config.fatal_window);
    let health_server = {
        let (addr, health) = (config.health_addr, health.clone());
        tokio::spawn(async move {
            if let Err(e) = server::serve(addr, health).await {
                error!("Health server stopped: {}", e);
            }
        })
    };

    // Wait for the Hello CRD before starting the watch
    info!("Waiting for Hello CRD to become available...");
    wait_for_hello_crd(&client).await?;

    let backoff = Backoff::new(config.backoff_base, config.backoff_max);
    let cache = DesiredCache::new();
    let queue = WorkQueue::new(backoff);
    let store = KubeStore::new(client.clone(), config.call_timeout);

    let controller = Arc::new(Controller::new(
        store.clone(),
        cache.clone(),
        queue.clone(),
        health.clone(),
        Arc::new(TracingSink),
    ));

    let hellos: Api<Hello> = match config.watch_namespace.as_deref() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let informer = Informer::new(cache.clone(), health.clone(), backoff);
    let dispatcher = Dispatcher::enqueueing(queue.clone());
    let informer_task = tokio::spawn(informer.run(
        move || watcher(hellos.clone(), watcher::Config::default()),
        dispatcher,
    ));

    let resync_task = tokio::spawn(run_resync(
        cache,
        store,
        queue.clone(),
        health,
        config.watch_namespace.clone(),
        config.resync_interval,
    ));

    info!("Starting {} workers...", config.workers);
    let workers: Vec<_> = (0..config.workers)
        .map(|id| tokio::spawn(controller.clone().run_worker(id)))
        .collect();

    shutdown_signal().await;
    info!("Shutdown requested, draining workers");

    queue.shut_down();
    informer_task.abort();
    resync_task.abort();

    if tokio::time::timeout(config.shutdown_grace, join_all(workers))
        .await
        .is_err()
    {
        warn!(
            "Workers did not finish within {:?}, exiting anyway",
            config.shutdown_grace
        );
    }

    health_server.abort();
    info!("Hello operator stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
