// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ConfigSet reconciler - drives the full render/apply cycle for one resource
//! per invocation and persists the reduced status.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, Controller},
    Api, Client, Resource, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::constants::FINALIZER;
use crate::error::{Result, WeftError};
use crate::kubernetes::{KubeStore, ObjectStore};
use crate::ownership::{Labeler, Owner};
use crate::render::ExecRender;
use crate::source::SourceCache;
use crate::sync::orchestrator::{run_cycle, CycleInput};
use crate::sync::status;
use crate::types::configset::{ConfigSet, ConfigSetStatus};

/// Fallback requeue delay when the retry interval itself cannot be parsed
const FALLBACK_RETRY: Duration = Duration::from_secs(60);

pub struct ConfigSetReconciler {
    client: Client,
    store: KubeStore,
    renderer: ExecRender,
    labeler: Labeler,
    config: Config,
}

impl ConfigSetReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        let store = KubeStore::new(client.clone());
        let renderer = ExecRender::new(config.renderer_path.clone());
        let labeler = Labeler::new(config.label_prefix.clone());

        Self {
            client,
            store,
            renderer,
            labeler,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let configsets: Api<ConfigSet> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(configsets, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled configset: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(cr: Arc<ConfigSet>, ctx: Arc<ConfigSetReconciler>) -> Result<Action> {
    let name = cr.name_any();
    let namespace = cr.namespace().unwrap_or_default();
    let api: Api<ConfigSet> = Api::namespaced(ctx.client.clone(), &namespace);

    info!("Reconciling ConfigSet: {}/{}", namespace, name);

    // Deletion short-circuits everything else; the finalizer is the only
    // cleanup to run.
    if cr.metadata.deletion_timestamp.is_some() {
        if cr.finalizers().iter().any(|f| f == FINALIZER) {
            remove_finalizer(&api, &cr).await?;
        }
        return Ok(Action::await_change());
    }

    if !cr.finalizers().iter().any(|f| f == FINALIZER) {
        add_finalizer(&api, &cr).await?;
        // The update triggers a fresh watch event; continue from there.
        return Ok(Action::await_change());
    }

    if cr.is_suspended() {
        info!(
            "Reconciliation is suspended for {}/{}, skipping until next update",
            namespace, name
        );
        return Ok(Action::await_change());
    }

    // Setup: the source cache and the render schema must be available before
    // any target can be processed.
    let source = SourceCache::new(&ctx.config.cache_root, &cr.spec.sources.git_repository);
    let setup = setup_cycle(&ctx, &source, &cr).await;
    let (revision, schema_path) = match setup {
        Ok(setup) => setup,
        Err(err) => {
            warn!("Setup failed for {}/{}: {}", namespace, name, err);
            let status = status::reduce_setup_failure(
                cr.status.as_ref(),
                cr.metadata.generation,
                &err.to_string(),
                Utc::now(),
            );
            if let Err(status_err) = update_status(&api, &name, &status).await {
                error!("Failed to update status on setup failure: {}", status_err);
            }
            return Err(err);
        }
    };

    let group = ConfigSet::group(&());
    let version = ConfigSet::version(&());
    let kind = ConfigSet::kind(&());
    let owner = Owner {
        api_group: group.as_ref(),
        api_version: version.as_ref(),
        kind: kind.as_ref(),
        name: &name,
        namespace: &namespace,
    };
    let ownership_labels = ctx.labeler.ownership_labels(&owner, &revision);

    let source_dir = source.latest_dir();
    let cycle = run_cycle(
        &ctx.store,
        &ctx.renderer,
        &ctx.labeler,
        CycleInput {
            source_dir: &source_dir,
            schema_path: &schema_path,
            spec: &cr.spec,
            ownership_labels: &ownership_labels,
        },
    )
    .await;

    if let Err(err) = tokio::fs::remove_file(&schema_path).await {
        warn!(
            "Failed to remove temporary schema file {}: {}",
            schema_path.display(),
            err
        );
    }

    let outcome = match cycle {
        Ok(outcome) => outcome,
        Err(err) => {
            // A matcher failure poisons the whole cycle, same as a setup error.
            warn!("Cycle failed for {}/{}: {}", namespace, name, err);
            let status = status::reduce_setup_failure(
                cr.status.as_ref(),
                cr.metadata.generation,
                &err.to_string(),
                Utc::now(),
            );
            if let Err(status_err) = update_status(&api, &name, &status).await {
                error!("Failed to update status on cycle failure: {}", status_err);
            }
            return Err(err);
        }
    };

    if !outcome.missed.is_empty() {
        info!("Missed exact matchers: {}", outcome.missed.join(","));
    }

    let failed = !outcome.failures.is_empty();
    let status = status::reduce_cycle(
        cr.status.as_ref(),
        &outcome,
        cr.metadata.generation,
        &revision,
        Utc::now(),
    );

    // Persisting the reduced status is the one failure that goes back to the
    // dispatcher for its own retry handling.
    update_status(&api, &name, &status).await?;

    let delay = status::requeue_after(&cr.spec.reconciliation, failed)?;
    info!(
        "Reconciliation of {}/{} finished with {} failures, next run in {:?}",
        namespace,
        name,
        outcome.failures.len(),
        delay
    );

    Ok(Action::requeue(delay))
}

fn error_policy(cr: Arc<ConfigSet>, error: &WeftError, _ctx: Arc<ConfigSetReconciler>) -> Action {
    error!("Reconciliation error: {}", error);
    let delay = cr
        .spec
        .reconciliation
        .retry_interval()
        .unwrap_or(FALLBACK_RETRY);
    Action::requeue(delay)
}

async fn setup_cycle(
    ctx: &ConfigSetReconciler,
    source: &SourceCache,
    cr: &ConfigSet,
) -> Result<(String, PathBuf)> {
    source.ensure_ready().await?;
    let revision = source.revision().await?;
    let schema_path = fetch_schema(&ctx.store, &ctx.config.schema_dir, cr).await?;
    Ok((revision, schema_path))
}

/// Materialize the referenced schema ConfigMap into a file the renderer can
/// consume. The file lives for one cycle only.
async fn fetch_schema<S: ObjectStore>(
    store: &S,
    schema_dir: &Path,
    cr: &ConfigSet,
) -> Result<PathBuf> {
    let reference = &cr.spec.targets.schema;
    let config_map = store
        .get_config_map(&reference.config_map.namespace, &reference.config_map.name)
        .await?
        .ok_or_else(|| {
            WeftError::SetupError(format!(
                "schema configmap {}/{} not found",
                reference.config_map.namespace, reference.config_map.name
            ))
        })?;

    let content = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(&reference.key))
        .ok_or_else(|| {
            WeftError::SetupError(format!(
                "schema configmap {}/{} does not contain key {:?}",
                reference.config_map.namespace, reference.config_map.name, reference.key
            ))
        })?;

    tokio::fs::create_dir_all(schema_dir).await.map_err(|e| {
        WeftError::SetupError(format!(
            "failed to create schema directory {}: {}",
            schema_dir.display(),
            e
        ))
    })?;

    let path = schema_dir.join(format!(
        "{}-{}-{}",
        cr.namespace().unwrap_or_default(),
        cr.name_any(),
        reference.key
    ));
    tokio::fs::write(&path, content).await.map_err(|e| {
        WeftError::SetupError(format!(
            "failed to write schema file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(path)
}

async fn add_finalizer(api: &Api<ConfigSet>, cr: &ConfigSet) -> Result<()> {
    let mut finalizers = cr.finalizers().to_vec();
    finalizers.push(FINALIZER.to_string());

    info!(
        "Adding finalizer: {} to {}/{}",
        FINALIZER,
        cr.namespace().unwrap_or_default(),
        cr.name_any()
    );

    patch_finalizers(api, &cr.name_any(), finalizers).await
}

async fn remove_finalizer(api: &Api<ConfigSet>, cr: &ConfigSet) -> Result<()> {
    let finalizers: Vec<String> = cr
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect();

    patch_finalizers(api, &cr.name_any(), finalizers).await
}

async fn patch_finalizers(
    api: &Api<ConfigSet>,
    name: &str,
    finalizers: Vec<String>,
) -> Result<()> {
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

async fn update_status(api: &Api<ConfigSet>, name: &str, status: &ConfigSetStatus) -> Result<()> {
    let patch = json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryStore;
    use crate::types::configset::{
        ConfigMapReference, ConfigSetSpec, Defaults, Destination, GitRepositoryReference,
        NamingRule, Reconciliation, SchemaReference, Selection, Sources, Targets,
    };
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn make_configset() -> ConfigSet {
        ConfigSet {
            metadata: ObjectMeta {
                name: Some("collection".to_string()),
                namespace: Some("platform".to_string()),
                ..Default::default()
            },
            spec: ConfigSetSpec {
                targets: Targets {
                    schema: SchemaReference {
                        config_map: ConfigMapReference {
                            name: "render-schema".to_string(),
                            namespace: "platform".to_string(),
                        },
                        key: "schema.json".to_string(),
                    },
                    defaults: Defaults::default(),
                    iterations: BTreeMap::new(),
                    selection: Selection::default(),
                },
                destination: Destination {
                    namespace: "apps".to_string(),
                    naming: NamingRule::default(),
                },
                sources: Sources {
                    git_repository: GitRepositoryReference {
                        name: "config".to_string(),
                        namespace: "flux-system".to_string(),
                    },
                },
                reconciliation: Reconciliation {
                    interval: "10m".to_string(),
                    retry_interval: None,
                    suspend: false,
                },
            },
            status: None,
        }
    }

    fn make_schema_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("weft-schema-{test}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_fetch_schema_writes_the_referenced_key() {
        let store = InMemoryStore::new();
        store.insert_config_map(ConfigMap {
            metadata: ObjectMeta {
                name: Some("render-schema".to_string()),
                namespace: Some("platform".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "schema.json".to_string(),
                "{\"fields\":[]}".to_string(),
            )])),
            ..Default::default()
        });

        let schema_dir = make_schema_dir("found");
        let path = fetch_schema(&store, &schema_dir, &make_configset())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "{\"fields\":[]}");
    }

    #[tokio::test]
    async fn test_fetch_schema_fails_when_the_configmap_is_missing() {
        let store = InMemoryStore::new();
        let schema_dir = make_schema_dir("missing");

        let err = fetch_schema(&store, &schema_dir, &make_configset())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_fetch_schema_fails_when_the_key_is_missing() {
        let store = InMemoryStore::new();
        store.insert_config_map(ConfigMap {
            metadata: ObjectMeta {
                name: Some("render-schema".to_string()),
                namespace: Some("platform".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "other-key".to_string(),
                "{}".to_string(),
            )])),
            ..Default::default()
        });

        let schema_dir = make_schema_dir("nokey");
        let err = fetch_schema(&store, &schema_dir, &make_configset())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("does not contain key"));
    }
}
