// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::{HELLO_GROUP, HELLO_KIND, HELLO_VERSION};
use crate::error::Result;
use crate::queue::Backoff;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Poll schedule while the CRD is missing: doubling from the initial interval up to the cap
fn poll_schedule() -> Backoff {
    Backoff::new(
        Duration::from_secs(POLL_INTERVAL_SECS),
        Duration::from_secs(POLL_MAX_INTERVAL_SECS),
    )
}

/// Block until the Hello CRD is served by the API server
pub async fn wait_for_hello_crd(client: &Client) -> Result<()> {
    let schedule = poll_schedule();

    for attempt in 1u32.. {
        let delay = schedule.nominal(attempt);
        match check_hello_crd_exists(client).await {
            Ok(true) => break,
            Ok(false) => info!(
                attempt,
                "{}/{} {} not served yet, polling again in {:?}",
                HELLO_GROUP,
                HELLO_VERSION,
                HELLO_KIND,
                delay
            ),
            Err(e) => warn!(attempt, error = %e, "CRD discovery failed, polling again in {:?}", delay),
        }
        sleep(delay).await;
    }

    info!("{}/{} {} is served", HELLO_GROUP, HELLO_VERSION, HELLO_KIND);
    Ok(())
}

/// Whether discovery lists the Hello kind under its group and version
pub async fn check_hello_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[HELLO_GROUP])
        .run()
        .await?;

    let served = discovery
        .groups()
        .filter(|group| group.name() == HELLO_GROUP)
        .flat_map(|group| group.recommended_resources())
        .any(|(ar, _)| ar.kind == HELLO_KIND && ar.version == HELLO_VERSION);
    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;

    fn group_list(groups: serde_json::Value) -> String {
        serde_json::json!({
            "kind": "APIGroupList",
            "apiVersion": "v1",
            "groups": groups
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_crd_served() {
        let groups = group_list(serde_json::json!([{
            "name": "unusualfor.com",
            "versions": [{ "groupVersion": "unusualfor.com/v1", "version": "v1" }],
            "preferredVersion": { "groupVersion": "unusualfor.com/v1", "version": "v1" }
        }]));
        let resources = serde_json::json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "unusualfor.com/v1",
            "resources": [{
                "name": "hellos",
                "singularName": "hello",
                "namespaced": true,
                "kind": "Hello",
                "verbs": ["get", "list", "watch", "create", "update", "delete"]
            }]
        })
        .to_string();

        let client = MockService::new()
            .on_get("/apis", 200, &groups)
            .on_get("/apis/unusualfor.com/v1", 200, &resources)
            .into_client();

        assert!(check_hello_crd_exists(&client).await.unwrap());
    }

    #[test]
    fn test_poll_schedule_doubles_to_cap() {
        let schedule = poll_schedule();

        assert_eq!(schedule.nominal(1), Duration::from_secs(10));
        assert_eq!(schedule.nominal(2), Duration::from_secs(20));
        assert_eq!(schedule.nominal(3), Duration::from_secs(40));
        assert_eq!(schedule.nominal(4), Duration::from_secs(60));
        assert_eq!(schedule.nominal(9), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_crd_missing() {
        let client = MockService::new()
            .on_get("/apis", 200, &group_list(serde_json::json!([])))
            .into_client();

        assert!(!check_hello_crd_exists(&client).await.unwrap());
    }
}
