//! Engine process runtime for tengen.
//!
//! One broker owns one engine child process at a time. Concurrent callers
//! submit opaque JSON documents; the broker serializes them onto the
//! child's stdin one line at a time, a single read loop correlates stdout
//! lines back to pending callers, and a drain task keeps stderr from
//! filling up and deadlocking the child.

pub mod broker;
pub mod drain;
pub mod shutdown;
pub mod supervisor;

pub use broker::AnalysisBroker;
pub use shutdown::shutdown_child;
pub use supervisor::{EngineCommand, EngineProcess, Liveness, SpawnedEngine};
