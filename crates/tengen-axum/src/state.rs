//! Shared application state type.

use std::sync::Arc;

use tengen_core::ports::AnalysisEngine;

/// Services the handlers need, assembled at the composition root.
pub struct ApiContext {
    /// The engine behind `/analyze` and `/health`.
    pub engine: Arc<dyn AnalysisEngine>,
}

/// Application state shared across all handlers.
pub type AppState = Arc<ApiContext>;
