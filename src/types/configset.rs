// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;
use std::time::Duration;

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::constants::conditions;
use crate::error::Result;
use crate::types::duration::parse_duration;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "weft.dev", version = "v1alpha1", kind = "ConfigSet")]
#[kube(namespaced)]
#[kube(status = "ConfigSetStatus")]
#[kube(shortname = "cset")]
#[serde(rename_all = "camelCase")]
pub struct ConfigSetSpec {
    pub targets: Targets,
    pub destination: Destination,
    pub sources: Sources,
    pub reconciliation: Reconciliation,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Targets {
    /// Reference to the render schema consumed by the external renderer
    pub schema: SchemaReference,
    #[serde(default)]
    pub defaults: Defaults,
    /// Named targets to render; the map key is the target identity
    #[serde(default)]
    pub iterations: BTreeMap<String, Iteration>,
    #[serde(default)]
    pub selection: Selection,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReference {
    pub config_map: ConfigMapReference,
    #[serde(default = "default_schema_key")]
    pub key: String,
}

fn default_schema_key() -> String {
    "schema.json".to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default)]
    pub variables: Vec<NameValue>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    /// Variable overrides applied on top of the defaults, in order
    #[serde(default)]
    pub variables: Vec<NameValue>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default)]
    pub includes: Matchers,
    #[serde(default)]
    pub excludes: Matchers,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Matchers {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Namespace the generated objects are applied into
    pub namespace: String,
    #[serde(default)]
    pub naming: NamingRule,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default = "default_use_separator")]
    pub use_separator: bool,
}

fn default_use_separator() -> bool {
    true
}

impl Default for NamingRule {
    fn default() -> Self {
        NamingRule {
            prefix: None,
            suffix: None,
            use_separator: true,
        }
    }
}

impl NamingRule {
    /// Construct the generated object name for a target. Callers are
    /// responsible for DNS-label-safe inputs; no normalization happens here.
    pub fn render(&self, core: &str) -> String {
        let separator = if self.use_separator { "-" } else { "" };

        let mut name = core.to_string();
        if let Some(prefix) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            name = format!("{prefix}{separator}{name}");
        }
        if let Some(suffix) = self.suffix.as_deref().filter(|s| !s.is_empty()) {
            name = format!("{name}{separator}{suffix}");
        }

        name
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sources {
    pub git_repository: GitRepositoryReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositoryReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// Requeue delay after a clean cycle, e.g. "10m"
    pub interval: String,
    /// Requeue delay after a failed cycle; falls back to `interval`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<String>,
    #[serde(default)]
    pub suspend: bool,
}

impl Reconciliation {
    pub fn interval(&self) -> Result<Duration> {
        parse_duration(&self.interval)
    }

    pub fn retry_interval(&self) -> Result<Duration> {
        match self.retry_interval.as_deref() {
            Some(retry_interval) => parse_duration(retry_interval),
            None => self.interval(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSetStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// The last revision that was successfully applied for every target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied_revision: Option<String>,

    /// The last revision that was attempted for reconciliation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempted_revision: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconciled_at: Option<String>,

    #[serde(default)]
    pub failures: Vec<FailureRecord>,

    #[serde(default)]
    pub disabled: Vec<DisabledRecord>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// Name of the target that failed
    pub name: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisabledRecord {
    /// Name of the target whose object is exempt from enforcement
    pub name: String,
    /// Object kind, "ConfigMap" or "Secret"
    pub kind: String,
    pub target: DisabledTarget,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisabledTarget {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl ConfigSet {
    /// Check if this ConfigSet is ready based on its status conditions
    pub fn is_ready(&self) -> bool {
        self.ready_condition()
            .is_some_and(|c| c.status == conditions::STATUS_TRUE)
    }

    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.condition_type == conditions::READY)
    }

    pub fn is_suspended(&self) -> bool {
        self.spec.reconciliation.suspend
    }
}
