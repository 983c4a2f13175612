//! Composition root: wires config, provisioner, broker, and HTTP server.
//!
//! This is the only place infrastructure is assembled. Command handlers
//! stay thin and delegate here.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use tengen_axum::{ApiContext, start_server};
use tengen_core::config::AppConfig;
use tengen_core::domain::ModelArtifact;
use tengen_core::ports::AnalysisEngine;
use tengen_download::{FetchOptions, Provisioner, sha256_file};
use tengen_engine::AnalysisBroker;

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Provision every configured artifact. All artifacts are attempted even
/// when an earlier one fails, so one run surfaces every problem.
pub async fn provision(config: &AppConfig) -> Result<()> {
    let provisioner = Provisioner::new(reqwest::Client::new(), FetchOptions::default());
    let artifacts: Vec<ModelArtifact> =
        config.katago.artifacts().into_iter().cloned().collect();
    let results = provisioner.ensure_all(&artifacts).await;

    let mut failures = 0;
    for (artifact, result) in artifacts.iter().zip(results) {
        match result {
            Ok(outcome) => {
                info!(path = %artifact.path.display(), ?outcome, "artifact ready");
            }
            Err(err) => {
                failures += 1;
                error!(path = %artifact.path.display(), error = %err, "artifact unavailable");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} artifact(s) could not be provisioned");
    }
    Ok(())
}

/// Report configuration and artifact status without touching the network.
pub async fn check(config: &AppConfig) -> Result<()> {
    let mut problems = 0;

    problems += check_file("engine binary", &config.katago.path);
    problems += check_file("engine config", &config.katago.config_path);

    for artifact in config.katago.artifacts() {
        let path = artifact.path.as_path();
        if !path.is_file() {
            println!("missing   {}", path.display());
            problems += 1;
            continue;
        }
        match artifact.expected_sha256() {
            None => println!("present   {} (no checksum configured)", path.display()),
            Some(expected) => {
                let actual = sha256_file(path).await?;
                if actual == expected {
                    println!("verified  {}", path.display());
                } else {
                    println!("corrupt   {} (sha256 {actual})", path.display());
                    problems += 1;
                }
            }
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) found");
    }
    println!("configuration ok");
    Ok(())
}

fn check_file(label: &str, path: &std::path::Path) -> u32 {
    if path.is_file() {
        println!("present   {} ({label})", path.display());
        0
    } else {
        println!("missing   {} ({label})", path.display());
        1
    }
}

/// Provision artifacts, start the broker, and serve the HTTP API until
/// interrupted. The engine is stopped after the listener drains.
pub async fn serve(config: AppConfig) -> Result<()> {
    provision(&config).await?;

    let engine: Arc<dyn AnalysisEngine> = Arc::new(AnalysisBroker::from_config(&config.katago));
    let context = Arc::new(ApiContext {
        engine: Arc::clone(&engine),
    });

    start_server(context, &config.api.host, config.api.port, shutdown_signal())
        .await
        .with_context(|| {
            format!("failed to serve on {}:{}", config.api.host, config.api.port)
        })?;

    engine.shutdown().await;
    info!("engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
