// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent create-or-update of generated objects, preserving externally
//! owned metadata while forcing managed metadata and content.

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::ObjectMeta;

use crate::error::{Result, WeftError};
use crate::kubernetes::ObjectStore;
use crate::ownership::Labeler;

pub struct ApplyEngine<'a, S> {
    store: &'a S,
    labeler: &'a Labeler,
}

impl<'a, S: ObjectStore> ApplyEngine<'a, S> {
    pub fn new(store: &'a S, labeler: &'a Labeler) -> Self {
        ApplyEngine { store, labeler }
    }

    /// Pre-flight: refuse to touch an existing configmap whose ownership
    /// labels prove it belongs to another object. Absence is fine.
    pub async fn can_apply_config_map(&self, generated: &ConfigMap) -> Result<()> {
        let (namespace, name) = object_key(&generated.metadata);
        let Some(existing) = self.store.get_config_map(namespace, name).await? else {
            return Ok(());
        };

        self.labeler
            .match_ownership(
                existing.metadata.labels.as_ref(),
                generated.metadata.labels.as_ref(),
            )
            .map_err(|mismatch| WeftError::OwnershipConflict {
                kind: "configmap",
                mismatch,
            })
    }

    pub async fn can_apply_secret(&self, generated: &Secret) -> Result<()> {
        let (namespace, name) = object_key(&generated.metadata);
        let Some(existing) = self.store.get_secret(namespace, name).await? else {
            return Ok(());
        };

        self.labeler
            .match_ownership(
                existing.metadata.labels.as_ref(),
                generated.metadata.labels.as_ref(),
            )
            .map_err(|mismatch| WeftError::OwnershipConflict {
                kind: "secret",
                mismatch,
            })
    }

    /// Create or update the configmap. Returns `true` without touching the
    /// object when its reconcile label carries the disabled sentinel.
    pub async fn apply_config_map(&self, generated: &ConfigMap) -> Result<bool> {
        let (namespace, name) = object_key(&generated.metadata);
        let existing = self.store.get_config_map(namespace, name).await?;

        if !self
            .labeler
            .should_reconcile(existing.as_ref().and_then(|o| o.metadata.labels.as_ref()))
        {
            return Ok(true);
        }

        let desired = ConfigMap {
            metadata: self.merged_metadata(
                existing.as_ref().map(|o| &o.metadata),
                &generated.metadata,
            ),
            data: generated.data.clone(),
            binary_data: generated.binary_data.clone(),
            ..Default::default()
        };

        match existing {
            Some(_) => self.store.update_config_map(&desired).await?,
            None => self.store.create_config_map(&desired).await?,
        }

        Ok(false)
    }

    /// Create or update the secret, under the same disablement semantics as
    /// the configmap variant.
    pub async fn apply_secret(&self, generated: &Secret) -> Result<bool> {
        let (namespace, name) = object_key(&generated.metadata);
        let existing = self.store.get_secret(namespace, name).await?;

        if !self
            .labeler
            .should_reconcile(existing.as_ref().and_then(|o| o.metadata.labels.as_ref()))
        {
            return Ok(true);
        }

        let desired = Secret {
            metadata: self.merged_metadata(
                existing.as_ref().map(|o| &o.metadata),
                &generated.metadata,
            ),
            data: generated.data.clone(),
            string_data: generated.string_data.clone(),
            type_: generated.type_.clone(),
            immutable: generated.immutable,
        };

        match existing {
            Some(_) => self.store.update_secret(&desired).await?,
            None => self.store.create_secret(&desired).await?,
        }

        Ok(false)
    }

    // Start from the externally owned subset of the existing metadata, then
    // overlay every generated entry. A managed key that is no longer rendered
    // falls away; an external key never does unless the render names it.
    fn merged_metadata(&self, existing: Option<&ObjectMeta>, generated: &ObjectMeta) -> ObjectMeta {
        let mut annotations = self
            .labeler
            .filter_external(existing.and_then(|m| m.annotations.as_ref()));
        let mut labels = self
            .labeler
            .filter_external(existing.and_then(|m| m.labels.as_ref()));

        if let Some(generated_annotations) = &generated.annotations {
            annotations.extend(generated_annotations.clone());
        }
        if let Some(generated_labels) = &generated.labels {
            labels.extend(generated_labels.clone());
        }

        ObjectMeta {
            name: generated.name.clone(),
            namespace: generated.namespace.clone(),
            annotations: Some(annotations),
            labels: Some(labels),
            resource_version: existing.and_then(|m| m.resource_version.clone()),
            ..Default::default()
        }
    }
}

fn object_key(metadata: &ObjectMeta) -> (&str, &str) {
    (
        metadata.namespace.as_deref().unwrap_or_default(),
        metadata.name.as_deref().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::labels;
    use crate::ownership::Owner;
    use crate::test_utils::InMemoryStore;
    use std::collections::BTreeMap;

    fn make_labeler() -> Labeler {
        Labeler::new("weft.dev")
    }

    fn make_owner() -> Owner<'static> {
        Owner {
            api_group: "weft.dev",
            api_version: "v1alpha1",
            kind: "ConfigSet",
            name: "collection",
            namespace: "platform",
        }
    }

    fn make_generated_config_map(labeler: &Labeler, revision: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("api-server".to_string()),
                namespace: Some("apps".to_string()),
                labels: Some(labeler.ownership_labels(&make_owner(), revision)),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "config.yaml".to_string(),
                format!("revision: {revision}"),
            )])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_apply_creates_missing_config_map() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();
        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "abc");

        let disabled = engine.apply_config_map(&generated).await.unwrap();

        assert!(!disabled);
        let stored = store.config_map("apps", "api-server").unwrap();
        assert_eq!(stored.data, generated.data);
    }

    #[tokio::test]
    async fn test_apply_twice_is_content_stable() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();
        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "abc");

        engine.apply_config_map(&generated).await.unwrap();
        let first = store.config_map("apps", "api-server").unwrap();

        engine.apply_config_map(&generated).await.unwrap();
        let second = store.config_map("apps", "api-server").unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_apply_preserves_unrelated_external_label() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();

        let mut existing = make_generated_config_map(&labeler, "old");
        existing
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert("team".to_string(), "platform".to_string());
        store.insert_config_map(existing);

        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "new");
        engine.apply_config_map(&generated).await.unwrap();

        let stored = store.config_map("apps", "api-server").unwrap();
        let stored_labels = stored.metadata.labels.unwrap();
        assert_eq!(stored_labels.get("team"), Some(&"platform".to_string()));
        assert_eq!(
            stored_labels.get("weft.dev/revision"),
            Some(&"new".to_string())
        );
    }

    #[tokio::test]
    async fn test_apply_overwrites_external_label_the_render_mentions() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();

        let mut existing = make_generated_config_map(&labeler, "old");
        existing
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert("team".to_string(), "platform".to_string());
        store.insert_config_map(existing);

        let engine = ApplyEngine::new(&store, &labeler);
        let mut generated = make_generated_config_map(&labeler, "new");
        generated
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert("team".to_string(), "delivery".to_string());
        engine.apply_config_map(&generated).await.unwrap();

        let stored = store.config_map("apps", "api-server").unwrap();
        assert_eq!(
            stored.metadata.labels.unwrap().get("team"),
            Some(&"delivery".to_string())
        );
    }

    #[tokio::test]
    async fn test_apply_drops_stale_managed_label() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();

        let mut existing = make_generated_config_map(&labeler, "old");
        existing
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert("weft.dev/renamed-away".to_string(), "stale".to_string());
        store.insert_config_map(existing);

        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "new");
        engine.apply_config_map(&generated).await.unwrap();

        let stored = store.config_map("apps", "api-server").unwrap();
        assert!(!stored
            .metadata
            .labels
            .unwrap()
            .contains_key("weft.dev/renamed-away"));
    }

    #[tokio::test]
    async fn test_apply_respects_the_disable_marker() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();

        let mut existing = make_generated_config_map(&labeler, "pinned");
        existing.metadata.labels.as_mut().unwrap().insert(
            "weft.dev/reconcile".to_string(),
            labels::DISABLED.to_string(),
        );
        store.insert_config_map(existing.clone());

        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "new");
        let disabled = engine.apply_config_map(&generated).await.unwrap();

        assert!(disabled);
        let stored = store.config_map("apps", "api-server").unwrap();
        assert_eq!(stored.data, existing.data);
    }

    #[tokio::test]
    async fn test_can_apply_passes_when_object_is_absent() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();
        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "abc");

        assert!(engine.can_apply_config_map(&generated).await.is_ok());
    }

    #[tokio::test]
    async fn test_can_apply_passes_across_revisions() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();
        store.insert_config_map(make_generated_config_map(&labeler, "old"));

        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "new");

        assert!(engine.can_apply_config_map(&generated).await.is_ok());
    }

    #[tokio::test]
    async fn test_can_apply_rejects_foreign_object() {
        let store = InMemoryStore::new();
        let labeler = make_labeler();

        // An object without any ownership labels was not created by us.
        store.insert_config_map(ConfigMap {
            metadata: ObjectMeta {
                name: Some("api-server".to_string()),
                namespace: Some("apps".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });

        let engine = ApplyEngine::new(&store, &labeler);
        let generated = make_generated_config_map(&labeler, "abc");
        let err = engine.can_apply_config_map(&generated).await.unwrap_err();

        assert!(err.to_string().contains("owned by another object"));
        assert!(err.to_string().contains("weft.dev/owner-name"));
    }
}
