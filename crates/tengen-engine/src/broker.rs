//! Request broker.
//!
//! Multiplexes concurrent queries over one engine process. Queries are
//! opaque documents keyed by a correlation id; the engine echoes the id
//! on the matching response line. One read loop per process incarnation
//! resolves pending callers; when the process dies, every in-flight
//! request fails with `EngineError::Terminated` and the next submit
//! triggers a fresh lazy start.
//!
//! Known limitation: the broker enforces no per-request timeout. A caller
//! wanting a deadline must stop awaiting on its own; the broker-side entry
//! stays registered until the engine responds or dies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use tengen_core::config::{DeliveryMode, EngineConfig};
use tengen_core::domain::{Document, doc};
use tengen_core::error::{EngineError, EngineResult};
use tengen_core::ports::{AnalysisEngine, EngineStatus};

use crate::drain::spawn_stderr_drain;
use crate::supervisor::{EngineCommand, EngineProcess, Liveness};

/// How long the read loop waits to reap an exited process for its code.
const REAP_PATIENCE: Duration = Duration::from_millis(500);

type ResultSlot = oneshot::Sender<EngineResult<Document>>;

/// In-flight requests for one process incarnation.
///
/// Registration, resolution, and bulk failure all go through this one
/// lock. Once `open` is false the incarnation is dead and registration
/// is refused, so no entry can be added after the terminal sweep.
struct PendingSet {
    entries: HashMap<String, ResultSlot>,
    open: bool,
}

impl PendingSet {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            open: true,
        }
    }
}

/// Per-incarnation shared handles: the pending set and the write half.
///
/// The writer mutex serializes line writes so concurrent submitters never
/// interleave partial documents.
#[derive(Clone)]
struct Session {
    pending: Arc<Mutex<PendingSet>>,
    writer: Arc<Mutex<Option<ChildStdin>>>,
}

impl Session {
    fn new(stdin: ChildStdin) -> Self {
        Self {
            pending: Arc::new(Mutex::new(PendingSet::new())),
            writer: Arc::new(Mutex::new(Some(stdin))),
        }
    }

    async fn remove(&self, id: &str) -> Option<ResultSlot> {
        self.pending.lock().await.entries.remove(id)
    }

    /// Close the set and fail everything still pending, exactly once each.
    async fn fail_all(&self, error: &EngineError) {
        let drained: Vec<(String, ResultSlot)> = {
            let mut pending = self.pending.lock().await;
            pending.open = false;
            pending.entries.drain().collect()
        };
        if !drained.is_empty() {
            warn!(count = drained.len(), %error, "failing in-flight requests");
        }
        for (_, slot) in drained {
            let _ = slot.send(Err(error.clone()));
        }
    }
}

/// One tracked process with its session.
struct Incarnation {
    process: EngineProcess,
    session: Session,
}

struct EngineState {
    /// Bumped on every spawn so a stale read loop cannot clobber state
    /// belonging to a newer incarnation.
    epoch: u64,
    current: Option<Incarnation>,
    last_exit: Option<i32>,
}

struct Inner {
    command: EngineCommand,
    delivery: DeliveryMode,
    grace: Duration,
    state: Mutex<EngineState>,
}

/// Process-backed request broker for the analysis engine.
///
/// Explicitly constructed and explicitly owned: hold it in an `Arc` and
/// hand clones to whoever needs it. There is no ambient global instance.
pub struct AnalysisBroker {
    inner: Arc<Inner>,
}

impl AnalysisBroker {
    /// Create a broker that will launch the given command on first use.
    #[must_use]
    pub fn new(command: EngineCommand, delivery: DeliveryMode, grace: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                command,
                delivery,
                grace,
                state: Mutex::new(EngineState {
                    epoch: 0,
                    current: None,
                    last_exit: None,
                }),
            }),
        }
    }

    /// Build a broker straight from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            EngineCommand::from_config(config),
            config.delivery,
            config.shutdown_grace(),
        )
    }

    /// Submit one query and await its response document.
    ///
    /// Lazily starts the engine when no live process is tracked; concurrent
    /// submitters racing to start serialize on the state lock, so exactly
    /// one spawn happens and the rest find the live process.
    pub async fn submit(&self, mut query: Document) -> EngineResult<Document> {
        let session = self.ensure_started().await?;

        // Register before writing: a response can never arrive for an
        // entry that does not exist yet.
        let (id, rx) = Self::register(&session, &mut query).await?;

        let mut line = match serde_json::to_string(&query) {
            Ok(line) => line,
            Err(e) => {
                session.remove(&id).await;
                return Err(EngineError::protocol(format!(
                    "query could not be serialized: {e}"
                )));
            }
        };
        line.push('\n');

        // One atomic write+flush per document under the writer lock.
        let write_result = {
            let mut writer = session.writer.lock().await;
            match writer.as_mut() {
                Some(stdin) => match stdin.write_all(line.as_bytes()).await {
                    Ok(()) => stdin.flush().await,
                    Err(e) => Err(e),
                },
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "engine stdin closed",
                )),
            }
        };

        if let Err(e) = write_result {
            debug!(id, error = %e, "write to engine failed");
            // If the read loop's terminal sweep got there first the entry
            // is already resolved; otherwise resolve it ourselves.
            if session.remove(&id).await.is_some() {
                return Err(EngineError::terminated(None));
            }
        }

        match rx.await {
            Ok(result) => result,
            // Sender dropped without resolving; only reachable if the
            // sweeping task was aborted mid-flight.
            Err(_) => Err(EngineError::terminated(None)),
        }
    }

    /// Non-blocking liveness snapshot for health reporting.
    pub async fn status(&self) -> EngineStatus {
        let mut state = self.inner.state.lock().await;
        let polled = state
            .current
            .as_mut()
            .map(|inc| (inc.process.pid(), inc.process.poll_exit()));
        match polled {
            Some((pid, Liveness::Alive)) => EngineStatus {
                running: true,
                pid: Some(pid),
                exit_code: None,
            },
            Some((_, Liveness::Exited(code))) => {
                if code.is_some() {
                    state.last_exit = code;
                }
                EngineStatus {
                    running: false,
                    pid: None,
                    exit_code: state.last_exit,
                }
            }
            None => EngineStatus {
                running: false,
                pid: None,
                exit_code: state.last_exit,
            },
        }
    }

    /// Stop the engine and fail anything still pending. Idempotent: safe
    /// to call twice, and safe to race with the read loop's own sweep.
    pub async fn shutdown(&self) {
        let incarnation = {
            let mut state = self.inner.state.lock().await;
            // The old read loop's teardown no longer owns this state.
            state.epoch += 1;
            state.current.take()
        };

        let Some(incarnation) = incarnation else {
            return;
        };

        // No further writes reach the terminating process.
        incarnation.session.writer.lock().await.take();

        let exit_code = incarnation.process.shutdown(self.inner.grace).await;
        {
            let mut state = self.inner.state.lock().await;
            if exit_code.is_some() {
                state.last_exit = exit_code;
            }
        }

        incarnation
            .session
            .fail_all(&EngineError::terminated(exit_code))
            .await;
    }

    /// Single-flight lazy start: returns the live session, spawning the
    /// engine under the state lock if none is tracked.
    async fn ensure_started(&self) -> EngineResult<Session> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;

        if let Some(incarnation) = state.current.as_mut() {
            match incarnation.process.poll_exit() {
                Liveness::Alive => return Ok(incarnation.session.clone()),
                Liveness::Exited(code) => {
                    debug!(?code, "tracked engine process has exited; restarting");
                    if code.is_some() {
                        state.last_exit = code;
                    }
                    // Its read loop sweeps the old session's pending set.
                    state.current = None;
                }
            }
        }

        let spawned = inner.command.spawn()?;
        state.epoch += 1;
        let epoch = state.epoch;
        let pid = spawned.process.pid();

        let session = Session::new(spawned.stdin);
        spawn_stderr_drain(spawned.stderr, pid);
        tokio::spawn(read_loop(
            Arc::clone(inner),
            spawned.stdout,
            session.clone(),
            epoch,
        ));

        state.current = Some(Incarnation {
            process: spawned.process,
            session: session.clone(),
        });
        Ok(session)
    }

    /// Register a pending entry, assigning a correlation id if absent.
    async fn register(
        session: &Session,
        query: &mut Document,
    ) -> EngineResult<(String, oneshot::Receiver<EngineResult<Document>>)> {
        let mut pending = session.pending.lock().await;
        if !pending.open {
            // The incarnation died between ensure_started and here.
            return Err(EngineError::terminated(None));
        }

        let id = match doc::correlation_id(query) {
            Some(id) => {
                if pending.entries.contains_key(id) {
                    return Err(EngineError::protocol(format!(
                        "correlation id {id:?} is already in flight"
                    )));
                }
                id.to_string()
            }
            None => {
                let mut candidate = Uuid::new_v4().to_string();
                while pending.entries.contains_key(&candidate) {
                    candidate = Uuid::new_v4().to_string();
                }
                doc::set_correlation_id(query, candidate.clone());
                candidate
            }
        };

        let (tx, rx) = oneshot::channel();
        pending.entries.insert(id.clone(), tx);
        Ok((id, rx))
    }
}

#[async_trait]
impl AnalysisEngine for AnalysisBroker {
    async fn submit(&self, query: Document) -> EngineResult<Document> {
        Self::submit(self, query).await
    }

    async fn status(&self) -> EngineStatus {
        Self::status(self).await
    }

    async fn shutdown(&self) {
        Self::shutdown(self).await;
    }
}

/// One logical reader for the lifetime of a process incarnation.
async fn read_loop(inner: Arc<Inner>, stdout: ChildStdout, session: Session, epoch: u64) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&session, inner.delivery, &line).await,
            Ok(None) => {
                debug!("engine stdout closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "error reading engine stdout");
                break;
            }
        }
    }

    // Untrack the process, if this incarnation still owns it, and try to
    // observe its exit code for the terminal error.
    let taken = {
        let mut state = inner.state.lock().await;
        if state.epoch == epoch {
            state.current.take()
        } else {
            None
        }
    };
    let exit_code = match taken {
        Some(incarnation) => incarnation.process.reap(REAP_PATIENCE).await,
        None => None,
    };
    if exit_code.is_some() {
        let mut state = inner.state.lock().await;
        if state.epoch == epoch {
            state.last_exit = exit_code;
        }
    }

    // No further writes into a dead pipe.
    session.writer.lock().await.take();

    // Fail every remaining entry, including any registered between the
    // last successful read and this sweep.
    session
        .fail_all(&EngineError::terminated(exit_code))
        .await;
}

/// Handle one stdout line: skip blanks, tolerate parse failures, resolve
/// the matching pending entry if one exists.
async fn handle_line(session: &Session, delivery: DeliveryMode, line: &str) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }

    let document: Document = match serde_json::from_str(trimmed) {
        Ok(document) => document,
        Err(e) => {
            // Protocol anomaly, never fatal to the loop.
            warn!(error = %e, "skipping unparseable engine line");
            return;
        }
    };

    let Some(id) = doc::correlation_id(&document).map(str::to_string) else {
        debug!("discarding engine line without correlation id");
        return;
    };

    if delivery == DeliveryMode::FinalOnly && doc::is_during_search(&document) {
        debug!(id, "discarding in-progress line");
        return;
    }

    match session.remove(&id).await {
        Some(slot) => {
            // The receiver may have given up waiting; that is its right.
            let _ = slot.send(Ok(document));
        }
        None => debug!(id, "discarding line with unknown correlation id"),
    }
}
