//! Artifact provisioning decisions.
//!
//! `Provisioner::ensure` decides, per artifact, whether the local file is
//! acceptable as-is, needs to be fetched, or is an unrecoverable
//! configuration problem.

use tracing::{debug, info, warn};

use tengen_core::domain::ModelArtifact;
use tengen_core::error::{ProvisionError, ProvisionResult};

use crate::checksum::sha256_file;
use crate::fetch::{FetchOptions, fetch_artifact};

/// How an artifact ended up satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// File was present and no checksum was configured to check against.
    AlreadyPresent,
    /// File was present and its checksum matched.
    Verified,
    /// File was downloaded (and verified, when a checksum is configured).
    Fetched,
}

/// Ensures model artifacts exist on disk and match their checksums.
pub struct Provisioner {
    client: reqwest::Client,
    options: FetchOptions,
}

impl Provisioner {
    /// Create a provisioner with the given retry options.
    #[must_use]
    pub fn new(client: reqwest::Client, options: FetchOptions) -> Self {
        Self { client, options }
    }

    /// Ensure a single artifact is usable, fetching it when allowed.
    ///
    /// A second call on an already-satisfied artifact verifies the file
    /// again and performs no network I/O.
    pub async fn ensure(&self, artifact: &ModelArtifact) -> ProvisionResult<ProvisionOutcome> {
        let path = artifact.path();
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|err| ProvisionError::from_io_error(&err))?;

        if exists {
            let Some(expected) = artifact.expected_sha256() else {
                debug!(path = %path.display(), "artifact present, no checksum configured");
                return Ok(ProvisionOutcome::AlreadyPresent);
            };
            let actual = sha256_file(path).await?;
            if actual == expected {
                debug!(path = %path.display(), sha256 = %actual, "artifact checksum verified");
                return Ok(ProvisionOutcome::Verified);
            }
            if !artifact.auto_fetch {
                // The corrupt file is left in place for inspection.
                return Err(ProvisionError::checksum_mismatch(
                    path.display().to_string(),
                    expected,
                    actual,
                ));
            }
            warn!(
                path = %path.display(),
                expected = %expected,
                actual = %actual,
                "artifact checksum mismatch, re-fetching"
            );
            // The corrupt file is unusable; remove it before fetching so
            // a failed fetch cannot leave it masquerading as provisioned.
            tokio::fs::remove_file(path)
                .await
                .map_err(|err| ProvisionError::from_io_error(&err))?;
            return self.fetch(artifact).await;
        }

        if !artifact.auto_fetch {
            return Err(ProvisionError::missing_source(path.display().to_string()));
        }
        info!(path = %path.display(), "artifact missing, fetching");
        self.fetch(artifact).await
    }

    /// Ensure every artifact in the slice, independently.
    ///
    /// Results are returned in input order; one artifact failing does not
    /// stop the others from being provisioned.
    pub async fn ensure_all(
        &self,
        artifacts: &[ModelArtifact],
    ) -> Vec<ProvisionResult<ProvisionOutcome>> {
        let mut results = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            results.push(self.ensure(artifact).await);
        }
        results
    }

    async fn fetch(&self, artifact: &ModelArtifact) -> ProvisionResult<ProvisionOutcome> {
        let Some(url) = artifact.url.as_deref() else {
            return Err(ProvisionError::misconfigured(
                artifact.path().display().to_string(),
            ));
        };
        fetch_artifact(&self.client, artifact, url, &self.options).await?;
        Ok(ProvisionOutcome::Fetched)
    }
}

impl Default for Provisioner {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), FetchOptions::default())
    }
}
