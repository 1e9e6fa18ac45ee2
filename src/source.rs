// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-side of the source cache maintained by the external sync collaborator.
//!
//! The collaborator materializes the configuration tree under
//! `<cache_root>/<repository namespace>/<repository name>/latest` and records
//! the revision of the last fetched archive in a `lastarchive` marker file.

use std::path::{Path, PathBuf};

use crate::error::{Result, WeftError};
use crate::types::configset::GitRepositoryReference;

#[derive(Debug, Clone)]
pub struct SourceCache {
    dir: PathBuf,
}

impl SourceCache {
    pub fn new(cache_root: &Path, repository: &GitRepositoryReference) -> Self {
        SourceCache {
            dir: cache_root.join(&repository.namespace).join(&repository.name),
        }
    }

    /// The materialized configuration tree for the latest revision
    pub fn latest_dir(&self) -> PathBuf {
        self.dir.join("latest")
    }

    /// Content-addressed revision of the latest archive, read from the marker
    /// file. The marker holds `<revision>.<extension>`; only the revision part
    /// is returned.
    pub async fn revision(&self) -> Result<String> {
        let marker = self.dir.join("lastarchive");
        let content = tokio::fs::read_to_string(&marker).await.map_err(|e| {
            WeftError::SetupError(format!(
                "failed to read revision marker {}: {}",
                marker.display(),
                e
            ))
        })?;

        let revision = content
            .split('.')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if revision.is_empty() {
            return Err(WeftError::SetupError(format!(
                "revision marker {} is empty",
                marker.display()
            )));
        }

        Ok(revision)
    }

    /// Verify the cache holds a materialized tree to render from.
    pub async fn ensure_ready(&self) -> Result<()> {
        let latest = self.latest_dir();
        let metadata = tokio::fs::metadata(&latest).await.map_err(|e| {
            WeftError::SetupError(format!(
                "source cache {} is not available: {}",
                latest.display(),
                e
            ))
        })?;

        if !metadata.is_dir() {
            return Err(WeftError::SetupError(format!(
                "source cache {} is not a directory",
                latest.display()
            )));
        }

        Ok(())
    }
}
