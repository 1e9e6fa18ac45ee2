// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

use crate::ownership::OwnershipMismatch;

#[derive(Error, Debug)]
pub enum WeftError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Setup failed: {0}")]
    SetupError(String),

    #[error("Invalid matcher: {0}")]
    MatcherError(#[from] regex::Error),

    #[error("Render failed: {0}")]
    RenderError(String),

    #[error("desired {kind} exists already and is owned by another object: {mismatch}")]
    OwnershipConflict {
        kind: &'static str,
        mismatch: OwnershipMismatch,
    },

    #[error("Object store error: {0}")]
    StoreError(String),

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, WeftError>;
