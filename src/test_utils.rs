// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and building fixtures.

use crate::controller::{EventSink, ReconcileEvent};
use crate::types::{DesiredResource, Hello, HelloSpec, Payload, ResourceKey};
use http::{Request, Response};
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::Client;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request method and path.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    /// Routes that never answer
    stalled: Arc<Mutex<HashSet<(String, String)>>>,
    /// Every request seen, as "METHOD path?query"
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            stalled: Arc::new(Mutex::new(HashSet::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Leave requests to `method path` pending forever
    pub fn stall(self, method: &str, path: &str) -> Self {
        self.stalled
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Fall back to the longest registered prefix
        responses
            .iter()
            .filter(|((m, p), _)| m == method && path.starts_with(p.as_str()))
            .max_by_key(|((_, p), _)| p.len())
            .map(|(_, resp)| resp.clone())
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", method, target));

        if self.stalled.lock().unwrap().contains(&(method.clone(), path.clone())) {
            return Box::pin(std::future::pending::<Result<Response<Body>, tower::BoxError>>());
        }

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("path", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Kubernetes `Status` failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// A managed greeting ConfigMap as the API server would return it
pub fn config_map_json(namespace: &str, name: &str, greeting: &str, resource_version: &str) -> String {
    let owner = name.strip_prefix("hello-").unwrap_or(name);
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": resource_version,
            "labels": { "app": "hello-operator" },
            "annotations": { "unusualfor.com/owner": owner }
        },
        "data": { "greeting": greeting }
    })
    .to_string()
}

/// A `Hello` in the default namespace
pub fn make_hello(name: &str, person: Option<&str>) -> Hello {
    Hello {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: HelloSpec {
            name: person.map(Value::from),
        },
    }
}

/// A desired Hello in the default namespace with an arbitrary JSON spec
pub fn desired(name: &str, spec: Value) -> DesiredResource {
    let spec = match spec {
        Value::Object(map) => map.into_iter().collect(),
        _ => Default::default(),
    };
    DesiredResource {
        key: ResourceKey::new("Hello", "default", name),
        spec,
        resource_version: Some("1".to_string()),
    }
}

/// Payload holding a single greeting
pub fn greeting(text: &str) -> Payload {
    Payload::from([("greeting".to_string(), text.to_string())])
}

/// Sink keeping every record for later inspection
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &ReconcileEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
