// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One full pass over the selected targets. A failing target never aborts its
//! siblings; everything a user must know ends up in the outcome records.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::kubernetes::ObjectStore;
use crate::matcher;
use crate::ownership::Labeler;
use crate::render::{Render, RenderRequest};
use crate::sync::apply::ApplyEngine;
use crate::sync::outcome::{self, ObjectOutcome, TargetOutcome};
use crate::types::configset::{ConfigSetSpec, DisabledRecord, FailureRecord, NameValue};

/// Everything one cycle needs besides the collaborators.
pub struct CycleInput<'a> {
    pub source_dir: &'a Path,
    pub schema_path: &'a Path,
    pub spec: &'a ConfigSetSpec,
    pub ownership_labels: &'a BTreeMap<String, String>,
}

/// Aggregate result of one cycle, rebuilt from scratch every time.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub matched: Vec<String>,
    pub missed: Vec<String>,
    pub failures: Vec<FailureRecord>,
    pub disabled: Vec<DisabledRecord>,
}

/// Merge default variables with target overrides; the override wins on a
/// name collision.
pub fn merge_variables(
    defaults: &[NameValue],
    overrides: &[NameValue],
) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    for variable in defaults.iter().chain(overrides) {
        variables.insert(variable.name.clone(), variable.value.clone());
    }
    variables
}

/// Run one reconciliation pass. Targets are visited in sorted order; only a
/// matcher compilation error aborts the whole cycle.
#[instrument(skip_all, fields(namespace = %input.spec.destination.namespace))]
pub async fn run_cycle<S: ObjectStore, R: Render>(
    store: &S,
    renderer: &R,
    labeler: &Labeler,
    input: CycleInput<'_>,
) -> Result<CycleOutcome> {
    let targets = &input.spec.targets;
    let candidates: Vec<String> = targets.iterations.keys().cloned().collect();
    let selection = &targets.selection;

    let selected = matcher::filter(
        &candidates,
        &selection.includes.exact,
        &selection.includes.regex,
        &selection.excludes.exact,
        &selection.excludes.regex,
    )?;

    let engine = ApplyEngine::new(store, labeler);
    let mut outcomes = Vec::with_capacity(selected.matched.len());

    for target in &selected.matched {
        let Some(iteration) = targets.iterations.get(target) else {
            continue;
        };

        let request = RenderRequest {
            source_dir: input.source_dir.to_path_buf(),
            schema_path: input.schema_path.to_path_buf(),
            variables: merge_variables(&targets.defaults.variables, &iteration.variables),
            name: input.spec.destination.naming.render(target),
            namespace: input.spec.destination.namespace.clone(),
            extra_labels: input.ownership_labels.clone(),
        };

        let rendered = match renderer.render(&request).await {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!("Failed to render target {}: {}", target, err);
                outcomes.push(TargetOutcome::Failed {
                    name: target.clone(),
                    message: err.to_string(),
                });
                continue;
            }
        };

        // Pre-flight both kinds so the user sees every blocking reason in a
        // single pass.
        let mut conflicts = Vec::new();
        if let Err(err) = engine.can_apply_config_map(&rendered.config_map).await {
            conflicts.push(err.to_string());
        }
        if let Err(err) = engine.can_apply_secret(&rendered.secret).await {
            conflicts.push(err.to_string());
        }
        if !conflicts.is_empty() {
            outcomes.push(TargetOutcome::Failed {
                name: target.clone(),
                message: conflicts.join(" "),
            });
            continue;
        }

        let config_map = apply_config_map(&engine, &rendered.config_map).await;

        // A disabled configmap does not spare the secret; the two objects may
        // have independently different existing-label states. An apply error
        // does abort the rest of the target.
        let secret = if config_map.is_failed() {
            ObjectOutcome::Skipped
        } else {
            apply_secret(&engine, &rendered.secret).await
        };

        if !config_map.is_failed() && !secret.is_failed() {
            info!("Successfully reconciled rendered configmap and secret for: {target}");
        }

        outcomes.push(TargetOutcome::Processed {
            name: target.clone(),
            config_map,
            secret,
        });
    }

    let (failures, disabled) = outcome::collect(&outcomes);

    Ok(CycleOutcome {
        matched: selected.matched,
        missed: selected.missed,
        failures,
        disabled,
    })
}

async fn apply_config_map<S: ObjectStore>(
    engine: &ApplyEngine<'_, S>,
    generated: &ConfigMap,
) -> ObjectOutcome {
    let namespace = generated.metadata.namespace.clone().unwrap_or_default();
    let name = generated.metadata.name.clone().unwrap_or_default();

    match engine.apply_config_map(generated).await {
        Ok(false) => ObjectOutcome::Applied,
        Ok(true) => {
            info!("Skipping apply for configmap {namespace}/{name} as it is disabled for reconciliation");
            ObjectOutcome::Disabled {
                kind: "ConfigMap",
                name,
                namespace,
            }
        }
        Err(err) => {
            warn!("Failed to apply configmap {namespace}/{name}: {err}");
            ObjectOutcome::Failed(format!("failed to apply configmap {namespace}/{name}: {err}"))
        }
    }
}

async fn apply_secret<S: ObjectStore>(
    engine: &ApplyEngine<'_, S>,
    generated: &Secret,
) -> ObjectOutcome {
    let namespace = generated.metadata.namespace.clone().unwrap_or_default();
    let name = generated.metadata.name.clone().unwrap_or_default();

    match engine.apply_secret(generated).await {
        Ok(false) => ObjectOutcome::Applied,
        Ok(true) => {
            info!("Skipping apply for secret {namespace}/{name} as it is disabled for reconciliation");
            ObjectOutcome::Disabled {
                kind: "Secret",
                name,
                namespace,
            }
        }
        Err(err) => {
            warn!("Failed to apply secret {namespace}/{name}: {err}");
            ObjectOutcome::Failed(format!("failed to apply secret {namespace}/{name}: {err}"))
        }
    }
}
