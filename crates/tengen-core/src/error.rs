//! Error taxonomy for the engine broker and the provisioner.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`; I/O failures are captured as kind and
//! message strings so they survive serialization boundaries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for engine process and broker operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum EngineError {
    /// The engine process could not be created. Fatal to the triggering
    /// operation; the supervisor never retries a spawn on its own.
    #[error("failed to spawn engine: {message}")]
    Spawn {
        /// Detailed error message.
        message: String,
    },

    /// The engine process died or its output stream closed. Every request
    /// in flight at that moment fails with this.
    #[error("engine terminated{}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    Terminated {
        /// Exit code, when the process was reaped in time to observe one.
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    /// A line violated the one-JSON-object-per-line protocol. Logged and
    /// skipped by the read loop; never fatal to the loop itself.
    #[error("protocol error: {message}")]
    Protocol {
        /// Detailed error message.
        message: String,
    },

    /// I/O error on the engine's streams.
    #[error("engine I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g. "BrokenPipe").
        kind: String,
        /// Detailed error message.
        message: String,
    },
}

impl EngineError {
    /// Create a spawn error.
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn {
            message: message.into(),
        }
    }

    /// Create a terminated error with an optional exit code.
    #[must_use]
    pub const fn terminated(exit_code: Option<i32>) -> Self {
        Self::Terminated { exit_code }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Capture a `std::io::Error` as kind and message strings.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::Io {
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }

    /// Whether this failure means the process is gone and a later submit
    /// should trigger a fresh lazy start.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated { .. } | Self::Spawn { .. })
    }
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type for model artifact provisioning.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProvisionError {
    /// Computed checksum did not match the configured one.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artifact path.
        path: String,
        /// Expected checksum.
        expected: String,
        /// Actual computed checksum.
        actual: String,
    },

    /// File is absent and auto-fetch is disabled: nothing to provision from.
    #[error("artifact missing at {path} and auto-fetch is disabled")]
    MissingSource {
        /// Artifact path.
        path: String,
    },

    /// Auto-fetch is enabled but no source URL was configured.
    #[error("auto-fetch enabled for {path} but no source URL configured")]
    Misconfigured {
        /// Artifact path.
        path: String,
    },

    /// Fetch failed after exhausting the retry budget.
    #[error("download failed after {attempts} attempts: {message}")]
    Network {
        /// How many attempts were made.
        attempts: u32,
        /// Final error message.
        message: String,
    },

    /// Local I/O error during verification or replacement.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error.
        kind: String,
        /// Detailed error message.
        message: String,
    },
}

impl ProvisionError {
    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a missing source error.
    pub fn missing_source(path: impl Into<String>) -> Self {
        Self::MissingSource { path: path.into() }
    }

    /// Create a misconfiguration error.
    pub fn misconfigured(path: impl Into<String>) -> Self {
        Self::Misconfigured { path: path.into() }
    }

    /// Create a network error after the given number of attempts.
    pub fn network(attempts: u32, message: impl Into<String>) -> Self {
        Self::Network {
            attempts,
            message: message.into(),
        }
    }

    /// Capture a `std::io::Error` as kind and message strings.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::Io {
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }
}

/// Convenience result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
