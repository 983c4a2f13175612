//! Graceful shutdown for `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Gracefully shut down a child process, escalating to SIGKILL if needed.
///
/// # Strategy
/// 1. Send SIGTERM and wait up to `grace` for a graceful exit
/// 2. If still running, send SIGKILL
/// 3. Wait for process reaping (required to avoid zombies)
///
/// Safe to call on an already-dead handle: an exited child is reaped and
/// its status returned without signalling anything.
///
/// # Platform behavior
/// - Unix: SIGTERM via the nix crate, then SIGKILL via `.kill()`
/// - Windows: immediately calls `.kill()` (no graceful shutdown available)
pub async fn shutdown_child(mut child: Child, grace: Duration) -> io::Result<ExitStatus> {
    // Already exited - just reap.
    if let Ok(Some(status)) = child.try_wait() {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        shutdown_unix(&mut child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // No PID means the child was already reaped.
        return child.wait().await;
    };

    // Phase 1: SIGTERM with the configured grace period
    #[allow(clippy::cast_possible_wrap)]
    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    // Phase 2: SIGKILL (via Child::kill which uses SIGKILL on Unix)
    child.kill().await?;

    // Phase 3: Wait for reaping (should be fast after SIGKILL)
    child.wait().await
}
