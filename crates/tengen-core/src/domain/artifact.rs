//! Model artifact description.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A binary artifact the engine needs on disk before it can start.
///
/// Created from configuration. Only the provisioner mutates the file it
/// points at, and only via an atomic replace; the broker never touches it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelArtifact {
    /// Local destination path.
    pub path: PathBuf,
    /// Optional HTTP(S) source to fetch from.
    #[serde(default)]
    pub url: Option<String>,
    /// Optional expected SHA-256 checksum (hex).
    #[serde(default)]
    pub sha256: Option<String>,
    /// Whether the provisioner may fetch (or re-fetch) the file.
    #[serde(default)]
    pub auto_fetch: bool,
}

impl ModelArtifact {
    /// Create an artifact that must already exist locally.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            url: None,
            sha256: None,
            auto_fetch: false,
        }
    }

    /// Expected checksum, trimmed and lowercased for comparison.
    ///
    /// Whitespace-only values count as unset so a stray blank config line
    /// does not force a mismatch against every file.
    pub fn expected_sha256(&self) -> Option<String> {
        self.sha256
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Destination path as a `Path`.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_sha_is_normalized() {
        let artifact = ModelArtifact {
            sha256: Some("  ABCDEF0123  ".to_string()),
            ..ModelArtifact::local("/tmp/model.bin.gz")
        };
        assert_eq!(artifact.expected_sha256().as_deref(), Some("abcdef0123"));
    }

    #[test]
    fn blank_sha_counts_as_unset() {
        let artifact = ModelArtifact {
            sha256: Some("   ".to_string()),
            ..ModelArtifact::local("/tmp/model.bin.gz")
        };
        assert_eq!(artifact.expected_sha256(), None);
        assert_eq!(ModelArtifact::local("/tmp/m").expected_sha256(), None);
    }
}
