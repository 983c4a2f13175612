//! Streaming artifact fetch with retries.
//!
//! Downloads stream into a temp file in the destination's directory while
//! a running SHA-256 is updated per chunk, then the temp file is atomically
//! persisted over the destination. A failed or mismatched download never
//! leaves a partial file at the destination path.

use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use tengen_core::domain::ModelArtifact;
use tengen_core::error::{ProvisionError, ProvisionResult};

use crate::progress::ProgressThrottle;

/// Retry and backoff knobs for a fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Total attempts before giving up, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per subsequent attempt.
    pub backoff_base: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Download `url` to the artifact's path, verifying its checksum if one
/// is configured.
///
/// Both network failures and checksum mismatches of the downloaded bytes
/// are retried with exponential backoff up to the configured attempt
/// budget; a mismatched transfer may be transient corruption. Local I/O
/// errors abort immediately. The failed attempt's temp file is removed
/// either way.
pub async fn fetch_artifact(
    client: &reqwest::Client,
    artifact: &ModelArtifact,
    url: &str,
    options: &FetchOptions,
) -> ProvisionResult<()> {
    let attempts = options.max_attempts.max(1);
    let mut last_error = ProvisionError::network(0, "no attempts made");

    for attempt in 1..=attempts {
        if attempt > 1 {
            let delay = options.backoff_base * 2u32.pow(attempt - 2);
            warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "download failed, retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }

        match fetch_once(client, artifact, url).await {
            Ok(()) => return Ok(()),
            Err(
                err @ (ProvisionError::Network { .. } | ProvisionError::ChecksumMismatch { .. }),
            ) => last_error = err,
            Err(other) => return Err(other),
        }
    }

    Err(match last_error {
        ProvisionError::Network { message, .. } => ProvisionError::network(attempts, message),
        other => other,
    })
}

async fn fetch_once(
    client: &reqwest::Client,
    artifact: &ModelArtifact,
    url: &str,
) -> ProvisionResult<()> {
    let dest = artifact.path();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|err| ProvisionError::from_io_error(&err))?;

    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| ProvisionError::network(1, err.to_string()))?;
    let total_bytes = response.content_length();

    // Same filesystem as the destination, so the final rename is atomic.
    let tmp = tempfile::Builder::new()
        .prefix(".fetch-")
        .tempfile_in(parent)
        .map_err(|err| ProvisionError::from_io_error(&err))?;
    let mut writer = tokio::fs::File::from_std(
        tmp.reopen()
            .map_err(|err| ProvisionError::from_io_error(&err))?,
    );

    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut throttle = ProgressThrottle::default_interval();

    info!(url, dest = %dest.display(), ?total_bytes, "downloading artifact");
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| ProvisionError::network(1, err.to_string()))?
    {
        hasher.update(&chunk);
        writer
            .write_all(&chunk)
            .await
            .map_err(|err| ProvisionError::from_io_error(&err))?;
        downloaded += chunk.len() as u64;
        if throttle.should_emit() {
            match total_bytes {
                Some(total) if total > 0 => {
                    let percent = downloaded as f64 / total as f64 * 100.0;
                    info!(url, downloaded, total, percent = format!("{percent:.1}"), "download progress");
                }
                _ => info!(url, downloaded, "download progress"),
            }
        }
    }
    writer
        .flush()
        .await
        .map_err(|err| ProvisionError::from_io_error(&err))?;

    let actual = format!("{:x}", hasher.finalize());
    if let Some(expected) = artifact.expected_sha256() {
        if actual != expected {
            // Temp file is dropped and removed; the destination is untouched.
            return Err(ProvisionError::checksum_mismatch(
                dest.display().to_string(),
                expected,
                actual,
            ));
        }
    }

    tmp.persist(dest)
        .map_err(|err| ProvisionError::from_io_error(&err.error))?;
    info!(dest = %dest.display(), bytes = downloaded, sha256 = %actual, "artifact downloaded");
    Ok(())
}
