//! Application configuration types.
//!
//! These are plain data: loading, merging, and path resolution live in the
//! CLI crate. Every field that has a sensible default carries one so a
//! minimal config file only names the engine binary and model.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ModelArtifact;

/// How the broker resolves a pending request against streamed lines.
///
/// The engine can emit in-progress lines (`isDuringSearch: true`) before
/// the terminal one. Which line resolves the caller is an explicit choice,
/// not an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Resolve with the first line carrying the id, in-progress or not.
    FirstResponse,
    /// Discard in-progress lines; resolve only on the terminal line.
    #[default]
    FinalOnly,
}

/// Engine process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the katago binary.
    pub path: PathBuf,
    /// Path to the analysis engine config (`analysis.cfg`).
    pub config_path: PathBuf,
    /// Primary network weights.
    pub model: ModelArtifact,
    /// Optional human-play network weights.
    #[serde(default)]
    pub human_model: Option<ModelArtifact>,
    /// Extra arguments appended to the `analysis` command line.
    #[serde(default)]
    pub additional_args: Vec<String>,
    /// Directories prepended to `LD_LIBRARY_PATH` for the child.
    #[serde(default)]
    pub ld_library_paths: Vec<PathBuf>,
    /// Response delivery mode for the broker.
    #[serde(default)]
    pub delivery: DeliveryMode,
    /// Seconds to wait after SIGTERM before force-killing on shutdown.
    #[serde(default = "default_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl EngineConfig {
    /// All artifacts this engine needs provisioned, primary model first.
    pub fn artifacts(&self) -> Vec<&ModelArtifact> {
        let mut artifacts = vec![&self.model];
        if let Some(ref human) = self.human_model {
            artifacts.push(human);
        }
        artifacts
    }

    /// Grace period for shutdown as a `Duration`.
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

const fn default_grace_secs() -> u64 {
    5
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine process settings.
    pub katago: EngineConfig,
    /// HTTP listener settings.
    #[serde(default)]
    pub api: ApiConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let yaml_equivalent = serde_json::json!({
            "katago": {
                "path": "/usr/bin/katago",
                "config_path": "/etc/katago/analysis.cfg",
                "model": { "path": "/var/lib/tengen/model.bin.gz" }
            }
        });

        let config: AppConfig = serde_json::from_value(yaml_equivalent).unwrap();
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.katago.delivery, DeliveryMode::FinalOnly);
        assert_eq!(config.katago.shutdown_grace(), Duration::from_secs(5));
        assert!(config.katago.human_model.is_none());
        assert_eq!(config.katago.artifacts().len(), 1);
    }

    #[test]
    fn human_model_joins_artifact_list() {
        let config = EngineConfig {
            path: "/usr/bin/katago".into(),
            config_path: "/etc/katago/analysis.cfg".into(),
            model: ModelArtifact::local("/models/main.bin.gz"),
            human_model: Some(ModelArtifact::local("/models/human.bin.gz")),
            additional_args: vec![],
            ld_library_paths: vec![],
            delivery: DeliveryMode::default(),
            shutdown_grace_secs: 5,
        };
        assert_eq!(config.artifacts().len(), 2);
    }

    #[test]
    fn delivery_mode_uses_snake_case() {
        let mode: DeliveryMode = serde_json::from_str("\"first_response\"").unwrap();
        assert_eq!(mode, DeliveryMode::FirstResponse);
    }
}
