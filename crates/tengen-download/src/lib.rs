//! Model artifact provisioning for tengen.
//!
//! Guarantees the engine's binary artifacts exist locally and match their
//! configured checksums before the process that needs them is started.
//! Missing or corrupt artifacts are fetched over HTTP(S), streamed to a
//! sibling temp file with a running hash, atomically moved into place,
//! and retried with exponential backoff on failure.

pub mod checksum;
pub mod fetch;
pub mod progress;
pub mod provision;

pub use checksum::sha256_file;
pub use fetch::{FetchOptions, fetch_artifact};
pub use progress::ProgressThrottle;
pub use provision::{ProvisionOutcome, Provisioner};
