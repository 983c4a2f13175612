//! Analysis engine port.

use async_trait::async_trait;

use crate::domain::Document;
use crate::error::EngineResult;

/// Liveness snapshot for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    /// Whether a live engine process is currently tracked.
    pub running: bool,
    /// PID of the tracked process, when one exists.
    pub pid: Option<u32>,
    /// Exit code of the last process, when it has been reaped.
    pub exit_code: Option<i32>,
}

/// Contract between the broker and its collaborators (the HTTP facade).
///
/// Implementations multiplex concurrent `submit` calls over a single
/// engine process. Payloads are opaque; the only field touched is the
/// correlation id.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Submit one query and await its response document.
    ///
    /// Lazily starts the engine if no live process is tracked. A response
    /// carrying an engine-side `error` field still resolves as `Ok`; only
    /// process-level failures surface as `Err`.
    async fn submit(&self, query: Document) -> EngineResult<Document>;

    /// Non-blocking liveness query.
    async fn status(&self) -> EngineStatus;

    /// Stop the engine, failing anything still pending. Idempotent.
    async fn shutdown(&self);
}
