//! Engine process supervision.
//!
//! Spawning, liveness polling, and termination of the analysis engine
//! child process. No protocol logic lives here; the broker owns that.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use tengen_core::config::EngineConfig;
use tengen_core::error::{EngineError, EngineResult};

use crate::shutdown::shutdown_child;

/// Environment variable the child's library search paths are prepended to.
const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Description of how to launch the engine process.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    binary: PathBuf,
    args: Vec<String>,
    library_paths: Vec<PathBuf>,
}

impl EngineCommand {
    /// Start from a bare binary with no arguments.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            library_paths: Vec::new(),
        }
    }

    /// Build the katago analysis command line from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut command = Self::new(&config.path)
            .arg("analysis")
            .arg("-config")
            .arg(config.config_path.display().to_string())
            .arg("-model")
            .arg(config.model.path.display().to_string());

        if let Some(ref human) = config.human_model {
            command = command
                .arg("-human-model")
                .arg(human.path.display().to_string());
        }

        command.args
            .extend(config.additional_args.iter().cloned());
        command
            .library_paths
            .extend(config.ld_library_paths.iter().cloned());
        command
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Prepend a directory to the child's library search path.
    #[must_use]
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    /// Spawn the engine with piped stdio.
    ///
    /// The rest of the environment is inherited; only the library search
    /// path variable is rewritten, with configured entries first.
    pub fn spawn(&self) -> EngineResult<SpawnedEngine> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(joined) = self.joined_library_path() {
            cmd.env(LIBRARY_PATH_VAR, joined);
        }

        info!(binary = %self.binary.display(), args = ?self.args, "spawning engine");

        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::spawn(format!("{}: {e}", self.binary.display())))?;

        let pid = child
            .id()
            .ok_or_else(|| EngineError::spawn("child exited before a PID could be read"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::spawn("child stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::spawn("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::spawn("child stderr was not captured"))?;

        debug!(pid, "engine spawned");

        Ok(SpawnedEngine {
            process: EngineProcess { child, pid },
            stdin,
            stdout,
            stderr,
        })
    }

    /// Configured entries first, then whatever the parent already had.
    fn joined_library_path(&self) -> Option<OsString> {
        if self.library_paths.is_empty() {
            return None;
        }
        let mut entries: Vec<PathBuf> = self.library_paths.clone();
        if let Some(existing) = env::var_os(LIBRARY_PATH_VAR) {
            entries.extend(env::split_paths(&existing));
        }
        env::join_paths(entries).ok()
    }
}

/// Liveness of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Still running.
    Alive,
    /// Exited, with the code when one was observed.
    Exited(Option<i32>),
}

/// A freshly spawned engine with its stream handles split out.
///
/// The broker takes stdin and stdout for exclusive use and hands stderr
/// to the drain task; the supervisor keeps only the child handle.
pub struct SpawnedEngine {
    /// Owned handle to the OS process.
    pub process: EngineProcess,
    /// Exclusively-owned writable input stream.
    pub stdin: ChildStdin,
    /// Exclusively-owned readable output stream.
    pub stdout: ChildStdout,
    /// Readable diagnostic stream.
    pub stderr: ChildStderr,
}

/// Owned handle to a running engine process.
pub struct EngineProcess {
    child: Child,
    pid: u32,
}

impl EngineProcess {
    /// PID observed at spawn time.
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking liveness poll.
    pub fn poll_exit(&mut self) -> Liveness {
        match self.child.try_wait() {
            Ok(None) => Liveness::Alive,
            Ok(Some(status)) => Liveness::Exited(status.code()),
            // A wait error means the handle is unusable; treat as gone.
            Err(_) => Liveness::Exited(None),
        }
    }

    /// Reap the child, waiting at most `patience` for it to exit.
    ///
    /// Used after the output stream closed, when the process is expected
    /// to be gone already.
    pub async fn reap(mut self, patience: Duration) -> Option<i32> {
        match tokio::time::timeout(patience, self.child.wait()).await {
            Ok(Ok(status)) => status.code(),
            _ => None,
        }
    }

    /// Request graceful termination, force-killing after `grace`.
    pub async fn shutdown(self, grace: Duration) -> Option<i32> {
        match shutdown_child(self.child, grace).await {
            Ok(status) => status.code(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_missing_binary_is_spawn_error() {
        let err = EngineCommand::new("/nonexistent/katago")
            .spawn()
            .err()
            .expect("spawn should fail");
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn poll_exit_sees_process_die() {
        let spawned = EngineCommand::new("sh")
            .args(["-c", "exit 4"])
            .spawn()
            .expect("spawn sh");
        let mut process = spawned.process;

        // Wait for the child to exit, then poll.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(process.poll_exit(), Liveness::Exited(Some(4)));
        // Idempotent on an already-dead handle.
        assert!(matches!(process.poll_exit(), Liveness::Exited(_)));
    }

    #[tokio::test]
    async fn spawned_process_is_alive() {
        let spawned = EngineCommand::new("cat").spawn().expect("spawn cat");
        let mut process = spawned.process;
        assert_eq!(process.poll_exit(), Liveness::Alive);
        assert!(process.pid() > 0);

        let code = process.shutdown(Duration::from_secs(2)).await;
        // cat dies to SIGTERM without an exit code.
        assert!(code.is_none() || code == Some(0));
    }

    #[test]
    fn from_config_builds_analysis_command_line() {
        let config = EngineConfig {
            path: "/opt/katago/katago".into(),
            config_path: "/etc/katago/analysis.cfg".into(),
            model: tengen_core::ModelArtifact::local("/models/main.bin.gz"),
            human_model: Some(tengen_core::ModelArtifact::local("/models/human.bin.gz")),
            additional_args: vec!["-override-config".into(), "numSearchThreads=8".into()],
            ld_library_paths: vec!["/opt/cuda/lib64".into()],
            delivery: tengen_core::DeliveryMode::default(),
            shutdown_grace_secs: 5,
        };

        let command = EngineCommand::from_config(&config);
        assert_eq!(command.binary, PathBuf::from("/opt/katago/katago"));
        assert_eq!(
            command.args,
            vec![
                "analysis",
                "-config",
                "/etc/katago/analysis.cfg",
                "-model",
                "/models/main.bin.gz",
                "-human-model",
                "/models/human.bin.gz",
                "-override-config",
                "numSearchThreads=8",
            ]
        );
        assert_eq!(command.library_paths, vec![PathBuf::from("/opt/cuda/lib64")]);
    }
}
