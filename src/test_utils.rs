// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an in-memory object store, a canned renderer and a mock
//! HTTP service for kube clients.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::Client;
use tower::Service;

use crate::error::{Result, WeftError};
use crate::kubernetes::ObjectStore;
use crate::render::{Render, RenderRequest, Rendered};

/// Object store held entirely in memory, used to exercise the apply engine
/// and the orchestrator without a cluster.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    config_maps: Arc<Mutex<BTreeMap<(String, String), ConfigMap>>>,
    secrets: Arc<Mutex<BTreeMap<(String, String), Secret>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing configmap, as if another party created it earlier
    pub fn insert_config_map(&self, config_map: ConfigMap) {
        let key = object_key(&config_map.metadata);
        self.config_maps.lock().unwrap().insert(key, config_map);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = object_key(&secret.metadata);
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

fn object_key(metadata: &ObjectMeta) -> (String, String) {
    (
        metadata.namespace.clone().unwrap_or_default(),
        metadata.name.clone().unwrap_or_default(),
    )
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        Ok(self.config_map(namespace, name))
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        let key = object_key(&config_map.metadata);
        let mut config_maps = self.config_maps.lock().unwrap();
        if config_maps.contains_key(&key) {
            return Err(WeftError::StoreError(format!(
                "configmap {}/{} already exists",
                key.0, key.1
            )));
        }
        config_maps.insert(key, config_map.clone());
        Ok(())
    }

    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        let key = object_key(&config_map.metadata);
        let mut config_maps = self.config_maps.lock().unwrap();
        if !config_maps.contains_key(&key) {
            return Err(WeftError::StoreError(format!(
                "configmap {}/{} not found",
                key.0, key.1
            )));
        }
        config_maps.insert(key, config_map.clone());
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<()> {
        let key = object_key(&secret.metadata);
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(&key) {
            return Err(WeftError::StoreError(format!(
                "secret {}/{} already exists",
                key.0, key.1
            )));
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }

    async fn update_secret(&self, secret: &Secret) -> Result<()> {
        let key = object_key(&secret.metadata);
        let mut secrets = self.secrets.lock().unwrap();
        if !secrets.contains_key(&key) {
            return Err(WeftError::StoreError(format!(
                "secret {}/{} not found",
                key.0, key.1
            )));
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }
}

/// Renderer that builds deterministic objects straight from the request:
/// every variable becomes a data entry, the extra labels are stamped on both
/// objects. Individual names can be marked as failing.
#[derive(Clone, Default)]
pub struct CannedRender {
    fail_names: Vec<String>,
}

impl CannedRender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render whose generated object name equals `name`
    pub fn fail_on(mut self, name: &str) -> Self {
        self.fail_names.push(name.to_string());
        self
    }
}

#[async_trait]
impl Render for CannedRender {
    async fn render(&self, request: &RenderRequest) -> Result<Rendered> {
        if self.fail_names.contains(&request.name) {
            return Err(WeftError::RenderError(format!(
                "canned render failure for {}",
                request.name
            )));
        }

        let metadata = ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.namespace.clone()),
            labels: Some(request.extra_labels.clone()),
            ..Default::default()
        };

        let config_map = ConfigMap {
            metadata: metadata.clone(),
            data: Some(request.variables.clone()),
            ..Default::default()
        };

        let secret_data = request
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), ByteString(value.clone().into_bytes())))
            .collect();
        let secret = Secret {
            metadata,
            data: Some(secret_data),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        };

        Ok(Rendered { config_map, secret })
    }
}

/// A mock HTTP service that returns predefined responses based on request
/// method and path.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
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
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock configmap JSON response
pub fn config_map_json(name: &str, namespace: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid"
        },
        "data": {}
    })
    .to_string()
}
