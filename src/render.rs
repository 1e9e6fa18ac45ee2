// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Contract of the external rendering engine and the adapter that invokes it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, WeftError};

/// One render invocation for a single target.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source_dir: PathBuf,
    pub schema_path: PathBuf,
    /// Flat variable set, defaults already merged with target overrides
    pub variables: BTreeMap<String, String>,
    /// Name of both generated objects
    pub name: String,
    /// Namespace of both generated objects
    pub namespace: String,
    /// Labels the renderer must stamp onto both generated objects
    pub extra_labels: BTreeMap<String, String>,
}

/// The pair of objects produced for one target.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub config_map: ConfigMap,
    pub secret: Secret,
}

/// Turns a schema plus variables into manifest documents. Implemented by an
/// external collaborator; the engine only consumes the contract.
#[async_trait]
pub trait Render: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<Rendered>;
}

/// Adapter that shells out to the renderer binary. The binary receives the
/// request on its command line and writes two YAML documents to stdout: the
/// ConfigMap first, the Secret second.
#[derive(Debug, Clone)]
pub struct ExecRender {
    program: PathBuf,
}

impl ExecRender {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ExecRender {
            program: program.into(),
        }
    }

    fn arguments(request: &RenderRequest) -> Vec<String> {
        let mut arguments = vec![
            "render".to_string(),
            "--dir".to_string(),
            request.source_dir.display().to_string(),
            "--schema".to_string(),
            request.schema_path.display().to_string(),
            "--name".to_string(),
            request.name.clone(),
            "--namespace".to_string(),
            request.namespace.clone(),
        ];

        for (name, value) in &request.variables {
            arguments.push("--set".to_string());
            arguments.push(format!("{name}={value}"));
        }

        for (key, value) in &request.extra_labels {
            arguments.push("--label".to_string());
            arguments.push(format!("{key}={value}"));
        }

        arguments
    }

    fn parse_output(output: &[u8]) -> Result<Rendered> {
        let mut documents = serde_yaml::Deserializer::from_slice(output);

        let config_map_document = documents.next().ok_or_else(|| {
            WeftError::RenderError("renderer output is missing the configmap document".to_string())
        })?;
        let config_map = ConfigMap::deserialize(config_map_document)
            .map_err(|e| WeftError::RenderError(format!("invalid configmap document: {e}")))?;

        let secret_document = documents.next().ok_or_else(|| {
            WeftError::RenderError("renderer output is missing the secret document".to_string())
        })?;
        let secret = Secret::deserialize(secret_document)
            .map_err(|e| WeftError::RenderError(format!("invalid secret document: {e}")))?;

        Ok(Rendered { config_map, secret })
    }
}

#[async_trait]
impl Render for ExecRender {
    async fn render(&self, request: &RenderRequest) -> Result<Rendered> {
        let arguments = Self::arguments(request);
        debug!("Invoking renderer {} for {}", self.program.display(), request.name);

        let output = Command::new(&self.program)
            .args(&arguments)
            .output()
            .await
            .map_err(|e| {
                WeftError::RenderError(format!(
                    "failed to run renderer {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(WeftError::RenderError(format!(
                "renderer exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_output(&output.stdout)
    }
}
