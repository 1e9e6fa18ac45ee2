// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use weft::config::Config;
use weft::kubernetes::wait_for_configset_crd;
use weft::reconcilers::ConfigSetReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting weft operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: label_prefix={} cache_root={}",
        config.label_prefix,
        config.cache_root.display()
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the ConfigSet CRD before starting the reconciler
    info!("Waiting for ConfigSet CRD to become available...");
    wait_for_configset_crd(&client).await?;

    let reconciler = ConfigSetReconciler::new(client, config);

    info!("Starting reconciler...");
    reconciler.run().await?;

    // This should never be reached as the reconciler runs forever
    warn!("Reconciler stopped unexpectedly");
    Ok(())
}
