//! Port definitions consumed by adapter crates.

mod engine;

pub use engine::{AnalysisEngine, EngineStatus};
