//! Stderr drain.
//!
//! The engine logs heavily on stderr. Nothing here interprets it, but the
//! pipe must be consumed continuously: an un-drained stderr fills its
//! buffer and deadlocks the child. Lines are forwarded at debug level
//! under a dedicated target so they can be enabled in isolation.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use tokio::task::JoinHandle;
use tracing::debug;

/// Target for forwarded engine diagnostics.
pub const STDERR_TARGET: &str = "tengen::engine::stderr";

/// Spawn the drain task for one process incarnation.
///
/// Runs until end-of-stream, which happens when the process exits.
pub fn spawn_stderr_drain(stderr: ChildStderr, pid: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: STDERR_TARGET, pid, "{line}");
        }
        debug!(pid, "stderr drain exiting");
    })
}
