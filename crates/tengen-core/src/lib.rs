//! Core domain types and port definitions for tengen.
//!
//! This crate holds everything the adapter crates share: the opaque
//! analysis document type, the model artifact description, configuration
//! types, the error taxonomy, and the `AnalysisEngine` port implemented
//! by the broker in `tengen-engine`.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{ApiConfig, AppConfig, DeliveryMode, EngineConfig};
pub use domain::{Document, ModelArtifact, doc};
pub use error::{EngineError, EngineResult, ProvisionError, ProvisionResult};
pub use ports::{AnalysisEngine, EngineStatus};
