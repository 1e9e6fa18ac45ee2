// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_LABEL_PREFIX;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Key prefix for labels and annotations owned by the operator
    pub label_prefix: String,
    /// Root of the source cache maintained by the external sync collaborator
    pub cache_root: PathBuf,
    /// Path of the external renderer binary
    pub renderer_path: PathBuf,
    /// Directory where fetched render schemas are materialized
    pub schema_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let renderer_path = env::var("WEFT_RENDERER")
            .context("WEFT_RENDERER environment variable not set")?
            .into();
        let label_prefix =
            env::var("WEFT_LABEL_PREFIX").unwrap_or_else(|_| DEFAULT_LABEL_PREFIX.to_string());
        let cache_root = env::var("WEFT_CACHE_ROOT")
            .unwrap_or_else(|_| "/var/cache/weft".to_string())
            .into();
        let schema_dir = env::var("WEFT_SCHEMA_DIR")
            .unwrap_or_else(|_| "/tmp/weft-schemas".to_string())
            .into();

        Ok(Config {
            label_prefix,
            cache_root,
            renderer_path,
            schema_dir,
        })
    }
}
