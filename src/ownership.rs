// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Provenance labels stamped onto every generated object, and the rules that
//! arbitrate conflicts with objects owned by someone else.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::constants::{labels, OPERATOR_NAME};

/// Identity of the resource a generated object is created on behalf of
#[derive(Debug, Clone, Copy)]
pub struct Owner<'a> {
    pub api_group: &'a str,
    pub api_version: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    pub namespace: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("label {key:?} is set to {existing:?}, expected to be: {desired:?}")]
pub struct LabelMismatch {
    pub key: String,
    pub existing: String,
    pub desired: String,
}

/// Aggregate of every ownership label that did not match, so a user sees all
/// blocking reasons in a single reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipMismatch {
    pub mismatches: Vec<LabelMismatch>,
}

impl std::fmt::Display for OwnershipMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.mismatches.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for OwnershipMismatch {}

/// Label vocabulary bound to an injected key prefix.
#[derive(Debug, Clone)]
pub struct Labeler {
    prefix: String,
}

impl Labeler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Labeler {
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("{}/{}", self.prefix, suffix)
    }

    /// Build the fixed ownership label set for a generated object.
    pub fn ownership_labels(&self, owner: &Owner<'_>, revision: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (self.key(labels::GENERATED_BY), OPERATOR_NAME.to_string()),
            (self.key(labels::OWNER_API_GROUP), owner.api_group.to_string()),
            (
                self.key(labels::OWNER_API_VERSION),
                owner.api_version.to_string(),
            ),
            (self.key(labels::OWNER_KIND), owner.kind.to_string()),
            (self.key(labels::OWNER_NAME), owner.name.to_string()),
            (
                self.key(labels::OWNER_NAMESPACE),
                owner.namespace.to_string(),
            ),
            (self.key(labels::REVISION), revision.to_string()),
        ])
    }

    /// Check all ownership labels except the api version (in case of CRD
    /// version bump) and the revision of course. A missing label counts as a
    /// mismatch against a non-empty desired value.
    pub fn match_ownership(
        &self,
        existing: Option<&BTreeMap<String, String>>,
        desired: Option<&BTreeMap<String, String>>,
    ) -> Result<(), OwnershipMismatch> {
        let mut mismatches = Vec::new();

        for suffix in [
            labels::GENERATED_BY,
            labels::OWNER_API_GROUP,
            labels::OWNER_KIND,
            labels::OWNER_NAME,
            labels::OWNER_NAMESPACE,
        ] {
            let key = self.key(suffix);
            let existing_value = lookup(existing, &key);
            let desired_value = lookup(desired, &key);

            if existing_value != desired_value {
                mismatches.push(LabelMismatch {
                    key,
                    existing: existing_value.to_string(),
                    desired: desired_value.to_string(),
                });
            }
        }

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(OwnershipMismatch { mismatches })
        }
    }

    /// An object opts out of managed overwrites only when the reconcile label
    /// carries the disabled sentinel; every other state means "manage it".
    pub fn should_reconcile(&self, object_labels: Option<&BTreeMap<String, String>>) -> bool {
        lookup(object_labels, &self.key(labels::RECONCILE)) != labels::DISABLED
    }

    /// Keep only the entries not owned by the operator, i.e. keys that do not
    /// use the injected prefix. The preserved subset survives every apply.
    pub fn filter_external(
        &self,
        metadata: Option<&BTreeMap<String, String>>,
    ) -> BTreeMap<String, String> {
        metadata
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(key, _)| !key.starts_with(&self.prefix))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn lookup<'a>(entries: Option<&'a BTreeMap<String, String>>, key: &str) -> &'a str {
    entries
        .and_then(|e| e.get(key))
        .map(String::as_str)
        .unwrap_or_default()
}
